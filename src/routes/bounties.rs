use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Router;

use crate::entities::bounty::{bounty_entity, bounty_proof_entity};
use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::CtxState;
use crate::middleware::utils::extractor_utils::JsonValidated;
use crate::middleware::utils::string_utils::get_table_thing;
use crate::models::api_response::ApiResponse;
use crate::models::view::activity::ActivityView;
use crate::models::view::bounty::{BountyAssignmentView, BountyView};
use crate::models::view::proof::{ProofView, ProofWithBountyView};
use crate::services::assignment_service::{AssignInput, AssignmentService};
use crate::services::bounty_service::{BountyService, UpdateBountyInput};
use crate::services::proof_service::{ProofService, ReviewProofInput, SubmitProofInput};

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route(
            "/api/bounties/:bounty_id",
            get(get_bounty).patch(update_bounty).delete(delete_bounty),
        )
        .route(
            "/api/bounties/:bounty_id/assign",
            post(assign_bounty).delete(unassign_bounty),
        )
        .route("/api/bounties/:bounty_id/complete", post(complete_bounty))
        .route("/api/bounties/:bounty_id/activities", get(get_activities))
        .route(
            "/api/bounties/:bounty_id/proofs",
            get(get_proofs).post(submit_proof),
        )
        .route(
            "/api/bounties/:bounty_id/proofs/:proof_id",
            patch(review_proof).delete(delete_proof),
        )
}

async fn get_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
) -> CtxResult<ApiResponse<BountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = BountyService::new(&state.db.client, &ctx)
        .get(&bounty_id)
        .await?;
    Ok(ApiResponse::ok(bounty.into()))
}

async fn update_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
    JsonValidated(data): JsonValidated<UpdateBountyInput>,
) -> CtxResult<ApiResponse<BountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = BountyService::new(&state.db.client, &ctx)
        .update(&bounty_id, data)
        .await?;
    Ok(ApiResponse::ok(bounty.into()))
}

async fn delete_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
) -> CtxResult<ApiResponse<BountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = BountyService::new(&state.db.client, &ctx)
        .delete(&bounty_id)
        .await?;
    Ok(ApiResponse::ok(bounty.into()))
}

async fn assign_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
    JsonValidated(data): JsonValidated<AssignInput>,
) -> CtxResult<ApiResponse<BountyAssignmentView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let (bounty, assignee) = AssignmentService::new(&state.db.client, &ctx)
        .assign(&bounty_id, data)
        .await?;
    Ok(ApiResponse::ok(BountyAssignmentView {
        bounty: bounty.into(),
        assignee: assignee.map(Into::into),
    }))
}

async fn unassign_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
) -> CtxResult<ApiResponse<BountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = AssignmentService::new(&state.db.client, &ctx)
        .unassign(&bounty_id)
        .await?;
    Ok(ApiResponse::ok(bounty.into()))
}

async fn complete_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
) -> CtxResult<ApiResponse<BountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = BountyService::new(&state.db.client, &ctx)
        .complete(&bounty_id)
        .await?;
    Ok(ApiResponse::ok(bounty.into()))
}

async fn get_activities(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
) -> CtxResult<ApiResponse<Vec<ActivityView>>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let list = BountyService::new(&state.db.client, &ctx)
        .activities(&bounty_id)
        .await?;
    Ok(ApiResponse::ok(list.into_iter().map(Into::into).collect()))
}

async fn get_proofs(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
) -> CtxResult<ApiResponse<Vec<ProofView>>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let list = ProofService::new(&state.db.client, &ctx)
        .list(&bounty_id)
        .await?;
    Ok(ApiResponse::ok(list.into_iter().map(Into::into).collect()))
}

async fn submit_proof(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(bounty_id): Path<String>,
    JsonValidated(data): JsonValidated<SubmitProofInput>,
) -> CtxResult<ApiResponse<ProofWithBountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let (proof, bounty) = ProofService::new(&state.db.client, &ctx)
        .submit(&bounty_id, data)
        .await?;
    Ok(ApiResponse::ok(ProofWithBountyView {
        proof: proof.into(),
        bounty: bounty.into(),
    }))
}

async fn review_proof(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path((bounty_id, proof_id)): Path<(String, String)>,
    JsonValidated(data): JsonValidated<ReviewProofInput>,
) -> CtxResult<ApiResponse<ProofWithBountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let proof_id = get_table_thing(bounty_proof_entity::TABLE_NAME, &proof_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let (proof, bounty) = ProofService::new(&state.db.client, &ctx)
        .review(&bounty_id, &proof_id, data)
        .await?;
    Ok(ApiResponse::ok(ProofWithBountyView {
        proof: proof.into(),
        bounty: bounty.into(),
    }))
}

async fn delete_proof(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path((bounty_id, proof_id)): Path<(String, String)>,
) -> CtxResult<ApiResponse<BountyView>> {
    let bounty_id =
        get_table_thing(bounty_entity::TABLE_NAME, &bounty_id).map_err(|e| ctx.to_ctx_error(e))?;
    let proof_id = get_table_thing(bounty_proof_entity::TABLE_NAME, &proof_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = ProofService::new(&state.db.client, &ctx)
        .delete(&bounty_id, &proof_id)
        .await?;
    Ok(ApiResponse::ok(bounty.into()))
}
