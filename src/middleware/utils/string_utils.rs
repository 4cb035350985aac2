use crate::middleware::error::{AppError, AppResult};
use surrealdb::sql::Thing;

/// Builds a record id from a path segment which may or may not carry the table prefix.
pub fn get_table_thing(table: &str, value: &str) -> AppResult<Thing> {
    let key = match value.split_once(':') {
        Some((tb, key)) if tb == table => key,
        Some(_) => {
            return Err(AppError::EntityFailIdNotFound {
                ident: value.to_string(),
            })
        }
        None => value,
    };
    if key.is_empty() {
        return Err(AppError::Validation {
            description: "Empty record id".to_string(),
        });
    }
    Ok(Thing::from((table, key)))
}
