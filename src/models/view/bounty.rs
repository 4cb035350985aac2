use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_key;
use super::user::UserView;
use crate::entities::bounty::bounty_entity::Bounty;
use crate::entities::bounty::bounty_status::BountyStatus;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyView {
    pub id: String,
    pub workspace_id: String,
    pub creator_pubkey: String,
    pub assignee_pubkey: Option<String>,
    pub title: String,
    pub description: String,
    pub deliverables: String,
    pub amount: u64,
    pub status: BountyStatus,
    pub tags: Vec<String>,
    pub estimated_hours: Option<u32>,
    pub github_issue_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Bounty> for BountyView {
    fn from(bounty: Bounty) -> Self {
        BountyView {
            id: record_key(&bounty.id),
            workspace_id: record_key(&bounty.workspace),
            creator_pubkey: record_key(&bounty.creator),
            assignee_pubkey: bounty.assignee.as_ref().map(record_key),
            title: bounty.title,
            description: bounty.description,
            deliverables: bounty.deliverables,
            amount: bounty.amount,
            status: bounty.status,
            tags: bounty.tags,
            estimated_hours: bounty.estimated_hours,
            github_issue_url: bounty.github_issue_url,
            created_at: bounty.created_at,
            updated_at: bounty.updated_at,
            assigned_at: bounty.assigned_at,
            completed_at: bounty.completed_at,
            paid_at: bounty.paid_at,
        }
    }
}

/// Bounty together with the user it is assigned to.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyAssignmentView {
    #[serde(flatten)]
    pub bounty: BountyView,
    pub assignee: Option<UserView>,
}
