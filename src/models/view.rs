use surrealdb::sql::Thing;

pub mod activity;
pub mod bounty;
pub mod proof;
pub mod user;
pub mod workspace;

/// Record key without the table prefix, as exposed by the api.
pub fn record_key(thing: &Thing) -> String {
    thing.id.to_raw()
}
