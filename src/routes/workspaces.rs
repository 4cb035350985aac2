use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Router;
use serde_json::{json, Value};

use crate::entities::bounty::bounty_entity;
use crate::entities::workspace::workspace_entity;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::CtxState;
use crate::middleware::utils::extractor_utils::JsonValidated;
use crate::middleware::utils::string_utils::get_table_thing;
use crate::models::api_response::{ApiResponse, PaginationMeta};
use crate::models::view::bounty::{BountyAssignmentView, BountyView};
use crate::models::view::workspace::{BudgetView, WorkspaceMemberView, WorkspaceView};
use crate::services::assignment_service::AssignmentService;
use crate::services::bounty_service::{BountyListQuery, BountyService, CreateBountyInput};
use crate::services::workspace_service::{
    AddMemberInput, CreateWorkspaceInput, DepositInput, UpdateMemberInput, WorkspaceService,
};

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route("/api/workspaces", post(create_workspace))
        .route("/api/workspaces/:workspace_id", get(get_workspace))
        .route(
            "/api/workspaces/:workspace_id/members",
            get(get_members).post(add_member),
        )
        .route(
            "/api/workspaces/:workspace_id/members/:pubkey",
            patch(update_member).delete(remove_member),
        )
        .route("/api/workspaces/:workspace_id/budget", get(get_budget))
        .route("/api/workspaces/:workspace_id/budget/deposit", post(deposit))
        .route(
            "/api/workspaces/:workspace_id/bounties",
            get(list_bounties).post(create_bounty),
        )
        .route(
            "/api/workspaces/:workspace_id/bounties/:bounty_id/claim",
            patch(claim_bounty),
        )
        .route(
            "/api/workspaces/:workspace_id/bounties/:bounty_id/complete",
            patch(complete_bounty),
        )
}

async fn create_workspace(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    JsonValidated(data): JsonValidated<CreateWorkspaceInput>,
) -> CtxResult<ApiResponse<WorkspaceView>> {
    let workspace = WorkspaceService::new(&state.db.client, &ctx)
        .create(data)
        .await?;
    Ok(ApiResponse::ok(workspace.into()))
}

async fn get_workspace(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(workspace_id): Path<String>,
) -> CtxResult<ApiResponse<WorkspaceView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let workspace = WorkspaceService::new(&state.db.client, &ctx)
        .get(&workspace_id)
        .await?;
    Ok(ApiResponse::ok(workspace.into()))
}

async fn get_members(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(workspace_id): Path<String>,
) -> CtxResult<ApiResponse<Vec<WorkspaceMemberView>>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let members = WorkspaceService::new(&state.db.client, &ctx)
        .members(&workspace_id)
        .await?;
    Ok(ApiResponse::ok(members.into_iter().map(Into::into).collect()))
}

async fn add_member(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(workspace_id): Path<String>,
    JsonValidated(data): JsonValidated<AddMemberInput>,
) -> CtxResult<ApiResponse<WorkspaceMemberView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let member = WorkspaceService::new(&state.db.client, &ctx)
        .add_member(&workspace_id, data)
        .await?;
    Ok(ApiResponse::ok(member.into()))
}

async fn update_member(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path((workspace_id, pubkey)): Path<(String, String)>,
    JsonValidated(data): JsonValidated<UpdateMemberInput>,
) -> CtxResult<ApiResponse<WorkspaceMemberView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let member = WorkspaceService::new(&state.db.client, &ctx)
        .update_member(&workspace_id, &pubkey, data)
        .await?;
    Ok(ApiResponse::ok(member.into()))
}

async fn remove_member(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path((workspace_id, pubkey)): Path<(String, String)>,
) -> CtxResult<ApiResponse<Value>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    WorkspaceService::new(&state.db.client, &ctx)
        .remove_member(&workspace_id, &pubkey)
        .await?;
    Ok(ApiResponse::ok(json!({ "userPubkey": pubkey })))
}

async fn get_budget(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(workspace_id): Path<String>,
) -> CtxResult<ApiResponse<BudgetView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let budget = WorkspaceService::new(&state.db.client, &ctx)
        .budget(&workspace_id)
        .await?;
    Ok(ApiResponse::ok(budget.into()))
}

async fn deposit(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(workspace_id): Path<String>,
    JsonValidated(data): JsonValidated<DepositInput>,
) -> CtxResult<ApiResponse<BudgetView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let budget = WorkspaceService::new(&state.db.client, &ctx)
        .deposit(&workspace_id, data)
        .await?;
    Ok(ApiResponse::ok(budget.into()))
}

async fn create_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(workspace_id): Path<String>,
    JsonValidated(data): JsonValidated<CreateBountyInput>,
) -> CtxResult<ApiResponse<BountyView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = BountyService::new(&state.db.client, &ctx)
        .create(&workspace_id, data)
        .await?;
    Ok(ApiResponse::ok(bounty.into()))
}

async fn list_bounties(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(workspace_id): Path<String>,
    Query(query): Query<BountyListQuery>,
) -> CtxResult<ApiResponse<Vec<BountyView>>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let (list, total, pagination) = BountyService::new(&state.db.client, &ctx)
        .list(
            &workspace_id,
            query,
            state.default_page_size,
            state.max_page_size,
        )
        .await?;
    Ok(ApiResponse::paginated(
        list.into_iter().map(Into::into).collect(),
        PaginationMeta {
            start: pagination.start,
            count: pagination.count,
            total,
        },
    ))
}

async fn claim_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path((workspace_id, bounty_id)): Path<(String, String)>,
) -> CtxResult<ApiResponse<BountyAssignmentView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let bounty_id = get_table_thing(bounty_entity::TABLE_NAME, &bounty_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let bounty = BountyService::new(&state.db.client, &ctx)
        .get_in_workspace(&workspace_id, &bounty_id)
        .await?;
    let (bounty, assignee) = AssignmentService::new(&state.db.client, &ctx)
        .claim(&bounty)
        .await?;
    Ok(ApiResponse::ok(BountyAssignmentView {
        bounty: bounty.into(),
        assignee: assignee.map(Into::into),
    }))
}

async fn complete_bounty(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path((workspace_id, bounty_id)): Path<(String, String)>,
) -> CtxResult<ApiResponse<BountyView>> {
    let workspace_id = get_table_thing(workspace_entity::TABLE_NAME, &workspace_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let bounty_id = get_table_thing(bounty_entity::TABLE_NAME, &bounty_id)
        .map_err(|e| ctx.to_ctx_error(e))?;
    let service = BountyService::new(&state.db.client, &ctx);
    service.get_in_workspace(&workspace_id, &bounty_id).await?;
    let bounty = service.complete(&bounty_id).await?;
    Ok(ApiResponse::ok(bounty.into()))
}
