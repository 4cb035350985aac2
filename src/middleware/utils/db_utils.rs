use core::fmt;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use surrealdb::sql::Thing;
use surrealdb::Response;

use crate::database::client::Db;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, AppResult, CtxResult};

// messages thrown from inside transactions, mapped back in check_transaction_custom_error
pub const THROW_INSUFFICIENT_BUDGET: &str = "Insufficient available budget";
pub const THROW_PREFIX_INVALID_STATE: &str = "Invalid state: ";
pub const THROW_PREFIX_CONFLICT: &str = "Conflict: ";
pub const THROW_PREFIX_NOT_FOUND: &str = "Not found: ";
pub const THROW_PREFIX_VALIDATION: &str = "Validation: ";
const ENGINE_ERROR_WRAPPER: &str = "An error occurred: ";

pub enum IdentIdName {
    Id(Thing),
    ColumnIdent { column: String, val: String },
}

impl Display for IdentIdName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentIdName::Id(_) => f.write_str("$id"),
            IdentIdName::ColumnIdent { column, .. } => write!(f, "{column}=$val"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pagination {
    pub order_by: Option<String>,
    pub order_dir: Option<QryOrder>,
    pub count: u32,
    pub start: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QryOrder {
    DESC,
    ASC,
}

impl fmt::Display for QryOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QryOrder::DESC => write!(f, "DESC"),
            QryOrder::ASC => write!(f, "ASC"),
        }
    }
}

impl Pagination {
    pub fn to_query_str(&self) -> String {
        let order = match self.order_by {
            None => "".to_string(),
            Some(ref order_by) => format!(
                " ORDER BY {order_by} {}",
                self.order_dir.clone().unwrap_or(QryOrder::DESC)
            ),
        };
        format!("{order} LIMIT {} START {}", self.count, self.start)
    }
}

pub async fn get_entity<T: for<'a> Deserialize<'a>>(
    db: &Db,
    table_name: &str,
    ident: &IdentIdName,
) -> CtxResult<Option<T>> {
    let mut res = match ident {
        IdentIdName::Id(id) => {
            if id.tb != table_name {
                return Err(AppError::Generic {
                    description: format!("Wrong table for id {}", id.to_raw()),
                }
                .into());
            }
            db.query(format!("SELECT * FROM {ident};"))
                .bind(("id", id.clone()))
                .await?
        }
        IdentIdName::ColumnIdent { val, .. } => {
            db.query(format!("SELECT * FROM {table_name} WHERE {ident} LIMIT 1;"))
                .bind(("val", val.clone()))
                .await?
        }
    };
    Ok(res.take::<Option<T>>(0)?)
}

pub fn with_not_found_err<T>(opt: Option<T>, ctx: &Ctx, ident: &str) -> CtxResult<T> {
    match opt {
        None => Err(ctx.to_ctx_error(AppError::EntityFailIdNotFound {
            ident: ident.to_string(),
        })),
        Some(res) => Ok(res),
    }
}

fn thrown_to_app_error(message: &str) -> AppError {
    if message.contains(THROW_INSUFFICIENT_BUDGET) {
        return AppError::InsufficientBudget;
    }
    let tail = |prefix: &str| {
        message
            .find(prefix)
            .map(|ind| message[ind + prefix.len()..].to_string())
    };
    if let Some(description) = tail(THROW_PREFIX_CONFLICT) {
        AppError::Conflict { description }
    } else if let Some(ident) = tail(THROW_PREFIX_NOT_FOUND) {
        AppError::EntityFailIdNotFound { ident }
    } else if let Some(description) = tail(THROW_PREFIX_INVALID_STATE) {
        AppError::InvalidState { description }
    } else if let Some(description) = tail(THROW_PREFIX_VALIDATION) {
        AppError::Validation { description }
    } else {
        let description = message
            .strip_prefix(ENGINE_ERROR_WRAPPER)
            .unwrap_or(message)
            .to_string();
        AppError::Validation { description }
    }
}

fn is_write_conflict(error: &surrealdb::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("conflict") || msg.contains("can be retried")
}

/// A UNIQUE index rejected the write.
pub fn is_unique_index_violation(error: &surrealdb::Error) -> bool {
    error.to_string().contains("already contains")
}

/// Maps an error returned for the whole query, e.g. a failed commit.
pub fn map_query_error(error: surrealdb::Error, on_conflict: AppError) -> AppError {
    match error {
        surrealdb::Error::Db(surrealdb::error::Db::Thrown(ref msg)) => thrown_to_app_error(msg),
        ref e if is_write_conflict(e) => on_conflict,
        e => e.into(),
    }
}

/// Maps the first failed statement of a transaction to a typed error.
/// Write conflicts between concurrent transactions resolve to `on_conflict`.
pub fn check_transaction_custom_error(
    query_response: &mut Response,
    on_conflict: AppError,
) -> AppResult<()> {
    let mut errors = query_response
        .take_errors()
        .into_iter()
        .collect::<Vec<(usize, surrealdb::Error)>>();
    errors.sort_by_key(|(ind, _)| *ind);

    let primary = errors.iter().map(|(_, e)| e).find(|error| {
        !matches!(
            error,
            surrealdb::Error::Db(surrealdb::error::Db::QueryNotExecuted)
                | surrealdb::Error::Db(surrealdb::error::Db::QueryCancelled)
        )
    });

    let query_err = match primary {
        None if errors.is_empty() => None,
        None => Some(on_conflict),
        Some(surrealdb::Error::Db(surrealdb::error::Db::Thrown(msg))) => {
            Some(thrown_to_app_error(msg))
        }
        Some(surrealdb::Error::Api(surrealdb::error::Api::Query(msg)))
            if msg.contains(THROW_INSUFFICIENT_BUDGET)
                || msg.contains(THROW_PREFIX_CONFLICT)
                || msg.contains(THROW_PREFIX_NOT_FOUND)
                || msg.contains(THROW_PREFIX_INVALID_STATE)
                || msg.contains(THROW_PREFIX_VALIDATION) =>
        {
            Some(thrown_to_app_error(msg))
        }
        Some(error) if is_unique_index_violation(error) => Some(AppError::Conflict {
            description: "Record already exists".to_string(),
        }),
        Some(error) if is_write_conflict(error) => Some(on_conflict),
        Some(error) => Some(AppError::SurrealDb {
            source: error.to_string(),
        }),
    };

    match query_err {
        None => Ok(()),
        Some(err) => Err(err),
    }
}
