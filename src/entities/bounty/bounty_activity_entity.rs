use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use surrealdb::engine::any::Any;
use surrealdb::method::Query;
use surrealdb::sql::{Id, Thing};

use crate::database::client::Db;
use crate::entities::bounty::bounty_entity;
use crate::entities::user::local_user_entity;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};

pub const TABLE_NAME: &str = "bounty_activity";
const BOUNTY_TABLE: &str = bounty_entity::TABLE_NAME;
const USER_TABLE: &str = local_user_entity::TABLE_NAME;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BountyActivityAction {
    Created,
    Updated,
    StatusChanged,
    AmountChanged,
    Assigned,
    Claimed,
    Unassigned,
    ProofSubmitted,
    ProofReviewed,
    ProofDeleted,
    Paid,
    Completed,
    Cancelled,
    Deleted,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BountyActivity {
    pub id: Thing,
    pub bounty: Thing,
    pub actor: Thing,
    pub action: BountyActivityAction,
    #[serde(default)]
    pub detail: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One audit row waiting to be written with its mutation.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub actor: Thing,
    pub action: BountyActivityAction,
    pub detail: Value,
}

impl ActivityEntry {
    pub fn new(actor: &Thing, action: BountyActivityAction, detail: Value) -> Self {
        Self {
            actor: actor.clone(),
            action,
            detail,
        }
    }
}

pub struct BountyActivityDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

impl<'a> BountyActivityDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS bounty ON TABLE {TABLE_NAME} TYPE record<{BOUNTY_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS actor ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS action ON TABLE {TABLE_NAME} TYPE string READONLY;
    DEFINE FIELD IF NOT EXISTS detail ON TABLE {TABLE_NAME} FLEXIBLE TYPE object DEFAULT {{}} READONLY;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {TABLE_NAME} TYPE datetime DEFAULT time::now() READONLY;
    DEFINE INDEX IF NOT EXISTS bounty_idx ON TABLE {TABLE_NAME} COLUMNS bounty;
    DEFINE EVENT IF NOT EXISTS append_only ON TABLE {TABLE_NAME} WHEN $event != \"CREATE\" THEN {{
        THROW \"Activity log is append-only\"
    }};
    ");
        let mutation = self.db.query(sql).await?;

        mutation.check().expect("should mutate bounty_activity");

        Ok(())
    }

    /// Appends one activity row for the bounty bound as `$_b_id`.
    pub fn build_create_query<'b>(
        &self,
        query: Query<'b, Any>,
        entry: ActivityEntry,
        key: &str,
    ) -> Query<'b, Any> {
        let detail = match entry.detail {
            Value::Object(_) => entry.detail,
            Value::Null => Value::Object(Default::default()),
            other => serde_json::json!({ "value": other }),
        };
        query
            .query(format!(
                "CREATE $_act_{key}_id SET bounty = $_b_id, actor = $_act_{key}_actor,
                    action = $_act_{key}_action, detail = $_act_{key}_detail;"
            ))
            .bind((format!("_act_{key}_id"), Thing::from((TABLE_NAME, Id::ulid()))))
            .bind((format!("_act_{key}_actor"), entry.actor))
            .bind((format!("_act_{key}_action"), entry.action.to_string()))
            .bind((format!("_act_{key}_detail"), detail))
    }

    pub async fn list_by_bounty(&self, bounty: &Thing) -> CtxResult<Vec<BountyActivity>> {
        let mut res = self
            .db
            .query(format!(
                "SELECT * FROM {TABLE_NAME} WHERE bounty = $bounty ORDER BY created_at ASC;"
            ))
            .bind(("bounty", bounty.clone()))
            .await?;
        Ok(res.take::<Vec<BountyActivity>>(0)?)
    }
}
