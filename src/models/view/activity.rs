use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record_key;
use crate::entities::bounty::bounty_activity_entity::{BountyActivity, BountyActivityAction};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: String,
    pub bounty_id: String,
    pub actor_pubkey: String,
    pub action: BountyActivityAction,
    pub detail: Value,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<BountyActivity> for ActivityView {
    fn from(activity: BountyActivity) -> Self {
        ActivityView {
            id: record_key(&activity.id),
            bounty_id: record_key(&activity.bounty),
            actor_pubkey: record_key(&activity.actor),
            action: activity.action,
            detail: activity.detail,
            created_at: activity.created_at,
        }
    }
}
