use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::database::client::Database;
use crate::entities::bounty::bounty_activity_entity::BountyActivityDbService;
use crate::entities::bounty::bounty_entity::BountyDbService;
use crate::entities::bounty::bounty_proof_entity::BountyProofDbService;
use crate::entities::user::local_user_entity::LocalUserDbService;
use crate::entities::workspace::workspace_budget_entity::WorkspaceBudgetDbService;
use crate::entities::workspace::workspace_entity::WorkspaceDbService;
use crate::entities::workspace::workspace_member_entity::WorkspaceMemberDbService;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::AppResult;
use crate::middleware::mw_ctx::CtxState;
use crate::routes::{bounties, users, workspaces};

pub async fn run_migrations(database: &Database) -> AppResult<()> {
    let db = database.client.clone();
    let c = Ctx::new(Ok("migrations".to_string()), Uuid::new_v4());

    LocalUserDbService { db: &db, ctx: &c }.mutate_db().await?;
    WorkspaceDbService { db: &db, ctx: &c }.mutate_db().await?;
    WorkspaceMemberDbService { db: &db, ctx: &c }
        .mutate_db()
        .await?;
    WorkspaceBudgetDbService { db: &db, ctx: &c }
        .mutate_db()
        .await?;
    BountyDbService { db: &db, ctx: &c }.mutate_db().await?;
    BountyProofDbService { db: &db, ctx: &c }
        .mutate_db()
        .await?;
    BountyActivityDbService { db: &db, ctx: &c }
        .mutate_db()
        .await?;
    Ok(())
}

pub fn main_router(ctx_state: &Arc<CtxState>) -> Router {
    Router::new()
        .route("/hc", get(get_hc))
        .merge(users::routes())
        .merge(workspaces::routes())
        .merge(bounties::routes())
        .with_state(ctx_state.clone())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn get_hc() -> Response {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    (StatusCode::OK, format!("v{}", VERSION)).into_response()
}
