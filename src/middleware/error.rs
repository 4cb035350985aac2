use std::fmt;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidationErrors;

use crate::middleware::ctx::Ctx;
use crate::models::api_response::ApiResponse;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CtxError {
    pub error: AppError,
    pub req_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Generic { description: String },
    Validation { description: String },
    InvalidTransition { from: String, to: String },
    InsufficientBudget,
    InvalidState { description: String },
    EntityFailIdNotFound { ident: String },
    Forbidden,
    AuthorizationFail { required: String },
    Conflict { description: String },
    AuthFailNoIdentity,
    Serde { source: String },
    SurrealDb { source: String },
}

/// Error carrying the request id, rendered as the error envelope.
pub type CtxResult<T> = core::result::Result<T, CtxError>;
/// Any error before it is attached to a request.
pub type AppResult<T> = core::result::Result<T, AppError>;

impl std::error::Error for AppError {}

impl CtxError {
    pub fn from<T: Into<AppError>>(ctx: &Ctx) -> impl FnOnce(T) -> CtxError + '_ {
        |err| CtxError {
            req_id: ctx.req_id(),
            error: err.into(),
        }
    }
}

impl From<surrealdb::Error> for CtxError {
    fn from(value: surrealdb::Error) -> Self {
        CtxError {
            req_id: Uuid::new_v4(),
            error: value.into(),
        }
    }
}

impl From<AppError> for CtxError {
    fn from(value: AppError) -> Self {
        CtxError {
            req_id: Uuid::new_v4(),
            error: value,
        }
    }
}

impl From<ValidationErrors> for CtxError {
    fn from(value: ValidationErrors) -> Self {
        AppError::from(value).into()
    }
}

const INTERNAL: &str = "Internal error";

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic { description } => write!(f, "{description}"),
            Self::Validation { description } => write!(f, "{description}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "Invalid status transition from {from} to {to}")
            }
            Self::InsufficientBudget => write!(f, "Insufficient available budget"),
            Self::InvalidState { description } => write!(f, "{description}"),
            Self::EntityFailIdNotFound { ident } => write!(f, "{ident} not found"),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::AuthorizationFail { required } => write!(f, "{required}"),
            Self::Conflict { description } => write!(f, "{description}"),
            Self::AuthFailNoIdentity => write!(f, "Missing or invalid caller identity"),
            Self::Serde { source } => write!(f, "Serde error - {source}"),
            Self::SurrealDb { .. } => write!(f, "{INTERNAL}"),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Generic { .. }
            | AppError::Validation { .. }
            | AppError::InvalidTransition { .. }
            | AppError::InsufficientBudget
            | AppError::InvalidState { .. }
            | AppError::Serde { .. } => StatusCode::BAD_REQUEST,
            AppError::EntityFailIdNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden | AppError::AuthorizationFail { .. } => StatusCode::FORBIDDEN,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::AuthFailNoIdentity => StatusCode::UNAUTHORIZED,
            AppError::SurrealDb { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Generic { .. } | AppError::Validation { .. } | AppError::Serde { .. } => {
                "VALIDATION_ERROR"
            }
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::InsufficientBudget => "INSUFFICIENT_BUDGET",
            AppError::InvalidState { .. } => "INVALID_STATE",
            AppError::EntityFailIdNotFound { .. } => "NOT_FOUND",
            AppError::Forbidden | AppError::AuthorizationFail { .. } => "FORBIDDEN",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::AuthFailNoIdentity => "UNAUTHORIZED",
            AppError::SurrealDb { .. } => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

// REST error response
impl IntoResponse for CtxError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.error.status_code();
        if status_code.is_server_error() {
            tracing::error!(req_id = %self.req_id, error = ?self.error, "request failed");
        } else {
            tracing::debug!(req_id = %self.req_id, error = ?self.error, "request rejected");
        }
        let body = ApiResponse::<()>::error(ErrorBody {
            code: self.error.code().to_string(),
            message: self.error.to_string(),
        });
        let mut response = (status_code, Json(body)).into_response();
        // the real error for the logger
        response.extensions_mut().insert(self.error);
        response
    }
}

// External Errors
impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde {
            source: value.to_string(),
        }
    }
}

impl From<surrealdb::Error> for AppError {
    fn from(value: surrealdb::Error) -> Self {
        Self::SurrealDb {
            source: value.to_string(),
        }
    }
}

impl From<CtxError> for AppError {
    fn from(value: CtxError) -> Self {
        value.error
    }
}

impl From<ValidationErrors> for AppError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation {
            description: value.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Generic {
            description: value.to_string(),
        }
    }
}
