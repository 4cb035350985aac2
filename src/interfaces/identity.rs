use axum::http::HeaderMap;

use crate::middleware::error::AppResult;

/// Resolves the caller identity verified by the upstream auth layer.
pub trait IdentityVerifier {
    fn verify(&self, headers: &HeaderMap) -> AppResult<String>;
}
