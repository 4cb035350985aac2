use axum::http::HeaderMap;

use crate::interfaces::identity::IdentityVerifier;
use crate::middleware::error::{AppError, AppResult};
use crate::utils::validate_utils::is_valid_pubkey;

pub const DEFAULT_IDENTITY_HEADER: &str = "x-user-pubkey";

/// Trusts the pubkey header written by the auth proxy in front of the server.
#[derive(Debug, Clone)]
pub struct UpstreamHeaderIdentity {
    header: String,
}

impl UpstreamHeaderIdentity {
    pub fn new(header: &str) -> Self {
        Self {
            header: header.to_lowercase(),
        }
    }
}

impl Default for UpstreamHeaderIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_HEADER)
    }
}

impl IdentityVerifier for UpstreamHeaderIdentity {
    fn verify(&self, headers: &HeaderMap) -> AppResult<String> {
        let value = headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_lowercase())
            .ok_or(AppError::AuthFailNoIdentity)?;

        if !is_valid_pubkey(&value) {
            return Err(AppError::AuthFailNoIdentity);
        }
        Ok(value)
    }
}
