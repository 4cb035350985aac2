use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use axum::{async_trait, Json};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::middleware::error::{AppError, CtxError};
use crate::middleware::utils::db_utils::{Pagination, QryOrder};

/// Json body that passed its `validator` rules.
#[derive(Debug)]
pub struct JsonValidated<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonValidated<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            let err: CtxError = AppError::Validation {
                description: rejection.body_text(),
            }
            .into();
            err.into_response()
        })?;
        payload
            .validate()
            .map_err(|err| <CtxError as From<ValidationErrors>>::from(err).into_response())?;
        Ok(Self(payload))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaginationParams {
    pub start: Option<u32>,
    pub count: Option<u32>,
}

impl PaginationParams {
    pub fn to_pagination(&self, order_by: &str, default_count: u32, max_count: u32) -> Pagination {
        let count = self.count.unwrap_or(default_count).clamp(1, max_count);
        Pagination {
            order_by: Some(order_by.to_string()),
            order_dir: Some(QryOrder::DESC),
            count,
            start: self.start.unwrap_or(0),
        }
    }
}
