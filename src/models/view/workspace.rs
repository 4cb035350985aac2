use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_key;
use crate::access::workspace_role::WorkspaceRole;
use crate::entities::workspace::workspace_budget_entity::WorkspaceBudget;
use crate::entities::workspace::workspace_entity::Workspace;
use crate::entities::workspace::workspace_member_entity::WorkspaceMember;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub owner_pubkey: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Workspace> for WorkspaceView {
    fn from(ws: Workspace) -> Self {
        WorkspaceView {
            id: record_key(&ws.id),
            name: ws.name,
            description: ws.description,
            website: ws.website,
            owner_pubkey: record_key(&ws.owner),
            created_at: ws.created_at,
            updated_at: ws.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMemberView {
    pub workspace_id: String,
    pub user_pubkey: String,
    pub role: WorkspaceRole,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<WorkspaceMember> for WorkspaceMemberView {
    fn from(member: WorkspaceMember) -> Self {
        WorkspaceMemberView {
            workspace_id: record_key(&member.workspace),
            user_pubkey: record_key(&member.user),
            role: member.role,
            created_at: member.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    pub workspace_id: String,
    pub total_budget: u64,
    pub available_budget: u64,
    pub reserved_budget: u64,
    pub paid_budget: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<WorkspaceBudget> for BudgetView {
    fn from(budget: WorkspaceBudget) -> Self {
        BudgetView {
            workspace_id: record_key(&budget.workspace),
            total_budget: budget.total_budget,
            available_budget: budget.available_budget,
            reserved_budget: budget.reserved_budget,
            paid_budget: budget.paid_budget,
            updated_at: budget.updated_at,
        }
    }
}
