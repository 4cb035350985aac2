use std::sync::Arc;

use super::error::{AppError, AppResult, CtxError, CtxResult};
use crate::middleware::mw_ctx::CtxState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Ctx {
    result_user_pubkey: AppResult<String>,
    req_id: Uuid,
}

impl Ctx {
    pub fn new(result_user_pubkey: AppResult<String>, req_id: Uuid) -> Self {
        Self {
            result_user_pubkey,
            req_id,
        }
    }

    pub fn user_pubkey(&self) -> CtxResult<String> {
        self.result_user_pubkey
            .clone()
            .map_err(|error| self.to_ctx_error(error))
    }

    pub fn req_id(&self) -> Uuid {
        self.req_id
    }

    pub fn to_ctx_error(&self, error: AppError) -> CtxError {
        CtxError {
            req_id: self.req_id,
            error,
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<CtxState>> for Ctx {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<CtxState>,
    ) -> Result<Self, Self::Rejection> {
        let user_pubkey = state.identity.verify(&parts.headers);
        Ok(Ctx::new(user_pubkey, Uuid::new_v4()))
    }
}
