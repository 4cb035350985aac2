use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;

use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::CtxState;
use crate::middleware::utils::extractor_utils::JsonValidated;
use crate::models::api_response::ApiResponse;
use crate::models::view::user::UserView;
use crate::services::user_service::{RegisterUserInput, UserService};

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route("/api/users", post(register_user))
        .route("/api/users/:pubkey", get(get_user))
}

async fn register_user(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    JsonValidated(data): JsonValidated<RegisterUserInput>,
) -> CtxResult<ApiResponse<UserView>> {
    let user = UserService::new(&state.db.client, &ctx).register(data).await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn get_user(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    Path(pubkey): Path<String>,
) -> CtxResult<ApiResponse<UserView>> {
    let user = UserService::new(&state.db.client, &ctx).get(&pubkey).await?;
    Ok(ApiResponse::ok(user.into()))
}
