use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Id, Thing};
use tracing::{info, warn};

use crate::database::client::Db;
use crate::entities::bounty::bounty_activity_entity::{ActivityEntry, BountyActivityDbService};
use crate::entities::bounty::bounty_proof_entity::{BountyProofDbService, ProofOp};
use crate::entities::bounty::bounty_status::{walk_effects, BountyStamp, BountyStatus};
use crate::entities::user::local_user_entity;
use crate::entities::workspace::workspace_budget_entity::{LedgerOp, WorkspaceBudgetDbService};
use crate::entities::workspace::workspace_entity;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, AppResult, CtxResult};
use crate::middleware::utils::db_utils::{
    check_transaction_custom_error, get_entity, map_query_error, IdentIdName, Pagination,
    THROW_PREFIX_CONFLICT, THROW_PREFIX_INVALID_STATE, THROW_PREFIX_NOT_FOUND,
    THROW_PREFIX_VALIDATION,
};

pub const TABLE_NAME: &str = "bounty";
const USER_TABLE: &str = local_user_entity::TABLE_NAME;
const WORKSPACE_TABLE: &str = workspace_entity::TABLE_NAME;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bounty {
    pub id: Thing,
    pub workspace: Thing,
    pub creator: Thing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Thing>,
    pub title: String,
    pub description: String,
    pub deliverables: String,
    pub amount: u64,
    pub status: BountyStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_issue_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Bounty {
    pub fn is_assignee(&self, user: &Thing) -> bool {
        self.assignee.as_ref() == Some(user)
    }
}

#[derive(Debug)]
pub struct BountyCreate {
    pub workspace: Thing,
    pub creator: Thing,
    pub title: String,
    pub description: String,
    pub deliverables: String,
    pub amount: u64,
    pub status: BountyStatus,
    pub tags: Vec<String>,
    pub estimated_hours: Option<u32>,
    pub github_issue_url: Option<String>,
}

/// Plain field edits. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BountyChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deliverables: Option<String>,
    pub tags: Option<Vec<String>>,
    pub estimated_hours: Option<u32>,
    pub github_issue_url: Option<String>,
    pub amount: Option<u64>,
}

impl BountyChanges {
    pub fn is_empty(&self) -> bool {
        *self == BountyChanges::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssigneeChange {
    Set(Thing),
    Clear,
}

/// Everything one request changes on a bounty. Applied as a single transaction
/// that first re-checks the status and amount the plan was computed from.
#[derive(Debug, Clone)]
pub struct BountyMutation {
    pub bounty: Thing,
    pub workspace: Thing,
    pub expected_status: Vec<BountyStatus>,
    pub expected_amount: u64,
    pub status: Option<BountyStatus>,
    pub changes: BountyChanges,
    pub assignee: Option<AssigneeChange>,
    pub stamps: Vec<BountyStamp>,
    pub ledger: Vec<LedgerOp>,
    pub proofs: Vec<ProofOp>,
    pub activities: Vec<ActivityEntry>,
    pub soft_delete: bool,
}

impl BountyMutation {
    pub fn new(bounty: &Bounty) -> Self {
        Self {
            bounty: bounty.id.clone(),
            workspace: bounty.workspace.clone(),
            expected_status: vec![bounty.status],
            expected_amount: bounty.amount,
            status: None,
            changes: BountyChanges::default(),
            assignee: None,
            stamps: vec![],
            ledger: vec![],
            proofs: vec![],
            activities: vec![],
            soft_delete: false,
        }
    }

    /// Moves along the status table from `from`, collecting the ledger
    /// movements and timestamps bound to each edge.
    pub fn walk(mut self, from: BountyStatus, path: &[BountyStatus], amount: u64) -> AppResult<Self> {
        for effects in walk_effects(from, path, amount)? {
            if let Some(op) = effects.ledger {
                self.ledger.push(op);
            }
            if let Some(stamp) = effects.stamp {
                self.stamps.push(stamp);
            }
            if effects.clears_assignee {
                self.assignee = Some(AssigneeChange::Clear);
            }
        }
        if let Some(last) = path.last() {
            self.status = Some(*last);
        }
        Ok(self)
    }

    pub fn with_changes(mut self, changes: BountyChanges) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_assignee(mut self, assignee: AssigneeChange) -> Self {
        self.assignee = Some(assignee);
        self
    }

    pub fn with_ledger(mut self, op: LedgerOp) -> Self {
        self.ledger.push(op);
        self
    }

    pub fn with_proof(mut self, op: ProofOp) -> Self {
        self.proofs.push(op);
        self
    }

    pub fn with_activity(mut self, entry: ActivityEntry) -> Self {
        self.activities.push(entry);
        self
    }

    pub fn soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self
    }

    /// Message of the error raised when the bounty left the expected statuses.
    pub fn status_error(&self) -> String {
        let names = self
            .expected_status
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        format!("Bounty status must be {names}")
    }
}

#[derive(Debug, Default, Clone)]
pub struct BountyFilter {
    pub status: Option<BountyStatus>,
    pub assignee: Option<Thing>,
}

pub struct BountyDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

fn status_names(statuses: &[BountyStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

fn assignee_statuses() -> Vec<String> {
    status_names(
        &BountyStatus::ALL
            .into_iter()
            .filter(|s| s.holds_assignee())
            .collect::<Vec<_>>(),
    )
}

impl<'a> BountyDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let statuses = BountyStatus::ALL
            .iter()
            .map(|s| format!("'{s}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS workspace ON TABLE {TABLE_NAME} TYPE record<{WORKSPACE_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS creator ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS assignee ON TABLE {TABLE_NAME} TYPE option<record<{USER_TABLE}>>;
    DEFINE FIELD IF NOT EXISTS title ON TABLE {TABLE_NAME} TYPE string ASSERT string::len(string::trim($value)) > 0;
    DEFINE FIELD IF NOT EXISTS description ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS deliverables ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS amount ON TABLE {TABLE_NAME} TYPE int ASSERT $value > 0;
    DEFINE FIELD IF NOT EXISTS status ON TABLE {TABLE_NAME} TYPE string ASSERT $value INSIDE [{statuses}];
    DEFINE FIELD IF NOT EXISTS tags ON TABLE {TABLE_NAME} TYPE array<string> DEFAULT [];
    DEFINE FIELD IF NOT EXISTS estimated_hours ON TABLE {TABLE_NAME} TYPE option<int>;
    DEFINE FIELD IF NOT EXISTS github_issue_url ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() READONLY;
    DEFINE FIELD IF NOT EXISTS updated_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE time::now();
    DEFINE FIELD IF NOT EXISTS assigned_at ON TABLE {TABLE_NAME} TYPE option<datetime>;
    DEFINE FIELD IF NOT EXISTS completed_at ON TABLE {TABLE_NAME} TYPE option<datetime>;
    DEFINE FIELD IF NOT EXISTS paid_at ON TABLE {TABLE_NAME} TYPE option<datetime>;
    DEFINE FIELD IF NOT EXISTS deleted_at ON TABLE {TABLE_NAME} TYPE option<datetime>;
    DEFINE INDEX IF NOT EXISTS workspace_idx ON TABLE {TABLE_NAME} COLUMNS workspace;
    DEFINE INDEX IF NOT EXISTS assignee_idx ON TABLE {TABLE_NAME} COLUMNS assignee;
    DEFINE INDEX IF NOT EXISTS status_idx ON TABLE {TABLE_NAME} COLUMNS status;
    ");
        let mutation = self.db.query(sql).await?;

        mutation.check().expect("should mutate bounty");

        Ok(())
    }

    async fn fetch(&self, bounty_id: &Thing) -> CtxResult<Option<Bounty>> {
        get_entity::<Bounty>(self.db, TABLE_NAME, &IdentIdName::Id(bounty_id.clone())).await
    }

    /// Soft deleted bounties are reported as missing.
    pub async fn get(&self, bounty_id: &Thing) -> CtxResult<Bounty> {
        match self.fetch(bounty_id).await? {
            Some(bounty) if bounty.deleted_at.is_none() => Ok(bounty),
            _ => Err(self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                ident: "Bounty".to_string(),
            })),
        }
    }

    pub async fn create(&self, data: BountyCreate, activity: ActivityEntry) -> CtxResult<Bounty> {
        let bounty_id = Thing::from((TABLE_NAME, Id::ulid()));
        let activities = BountyActivityDbService {
            db: self.db,
            ctx: self.ctx,
        };

        let mut query = self.db.query("BEGIN TRANSACTION;");
        query = query
            .query(
                "CREATE $_b_id SET workspace = $_b_workspace, creator = $_b_creator,
                    title = $_b_title, description = $_b_description, deliverables = $_b_deliverables,
                    amount = $_b_amount, status = $_b_status, tags = $_b_tags,
                    estimated_hours = $_b_estimated_hours, github_issue_url = $_b_github_issue_url;",
            )
            .bind(("_b_id", bounty_id.clone()))
            .bind(("_b_workspace", data.workspace))
            .bind(("_b_creator", data.creator))
            .bind(("_b_title", data.title))
            .bind(("_b_description", data.description))
            .bind(("_b_deliverables", data.deliverables))
            .bind(("_b_amount", data.amount as i64))
            .bind(("_b_status", data.status.to_string()))
            .bind(("_b_tags", data.tags))
            .bind(("_b_estimated_hours", data.estimated_hours))
            .bind(("_b_github_issue_url", data.github_issue_url));
        query = activities.build_create_query(query, activity, "a0");
        query = query.query("COMMIT TRANSACTION;");

        let mut res = query.await?;
        check_transaction_custom_error(
            &mut res,
            AppError::Conflict {
                description: "Bounty could not be created".to_string(),
            },
        )
        .map_err(|e| self.ctx.to_ctx_error(e))?;

        info!(bounty = %bounty_id, "bounty created");
        self.get(&bounty_id).await
    }

    /// Runs a planned mutation in one transaction together with its ledger
    /// movements, proof writes and activity rows.
    pub async fn apply(&self, mutation: BountyMutation) -> CtxResult<Bounty> {
        let status_error = mutation.status_error();
        let on_conflict = AppError::Validation {
            description: status_error.clone(),
        };
        let budgets = WorkspaceBudgetDbService {
            db: self.db,
            ctx: self.ctx,
        };
        let proofs = BountyProofDbService {
            db: self.db,
            ctx: self.ctx,
        };
        let activities = BountyActivityDbService {
            db: self.db,
            ctx: self.ctx,
        };

        let mut query = self.db.query("BEGIN TRANSACTION;");
        query = query
            .query(format!("
                LET $_b = (SELECT * FROM $_b_id)[0];
                IF $_b == NONE OR $_b.deleted_at != NONE {{ THROW \"{THROW_PREFIX_NOT_FOUND}Bounty\" }};
                IF $_b.status NOTINSIDE $_b_expected {{ THROW $_b_status_error }};
                IF $_b.amount != $_b_expected_amount {{
                    THROW \"{THROW_PREFIX_CONFLICT}Bounty amount was changed concurrently\"
                }};
            "))
            .bind(("_b_id", mutation.bounty.clone()))
            .bind(("_b_expected", status_names(&mutation.expected_status)))
            .bind(("_b_status_error", format!("{THROW_PREFIX_VALIDATION}{status_error}")))
            .bind(("_b_expected_amount", mutation.expected_amount as i64));

        let mut sets: Vec<String> = vec![];
        if let Some(status) = mutation.status {
            sets.push("status = $_b_status".to_string());
            query = query.bind(("_b_status", status.to_string()));
        }
        let changes = mutation.changes;
        if let Some(title) = changes.title {
            sets.push("title = $_b_title".to_string());
            query = query.bind(("_b_title", title));
        }
        if let Some(description) = changes.description {
            sets.push("description = $_b_description".to_string());
            query = query.bind(("_b_description", description));
        }
        if let Some(deliverables) = changes.deliverables {
            sets.push("deliverables = $_b_deliverables".to_string());
            query = query.bind(("_b_deliverables", deliverables));
        }
        if let Some(tags) = changes.tags {
            sets.push("tags = $_b_tags".to_string());
            query = query.bind(("_b_tags", tags));
        }
        if let Some(hours) = changes.estimated_hours {
            sets.push("estimated_hours = $_b_estimated_hours".to_string());
            query = query.bind(("_b_estimated_hours", hours));
        }
        if let Some(url) = changes.github_issue_url {
            sets.push("github_issue_url = $_b_github_issue_url".to_string());
            query = query.bind(("_b_github_issue_url", url));
        }
        if let Some(amount) = changes.amount {
            sets.push("amount = $_b_amount".to_string());
            query = query.bind(("_b_amount", amount as i64));
        }
        let clears_assignee = match mutation.assignee {
            Some(AssigneeChange::Set(assignee)) => {
                sets.push("assignee = $_b_assignee".to_string());
                query = query.bind(("_b_assignee", assignee));
                false
            }
            Some(AssigneeChange::Clear) => {
                sets.push("assignee = NONE".to_string());
                sets.push("assigned_at = NONE".to_string());
                true
            }
            None => false,
        };
        for stamp in mutation.stamps {
            if clears_assignee && stamp == BountyStamp::AssignedAt {
                continue;
            }
            sets.push(format!("{} = time::now()", stamp.field()));
        }
        if mutation.soft_delete {
            sets.push("deleted_at = time::now()".to_string());
        }
        if !sets.is_empty() {
            query = query.query(format!("UPDATE $_b_id SET {};", sets.join(", ")));
        }

        for (i, op) in mutation.ledger.into_iter().enumerate() {
            query = budgets.build_ledger_query(query, &mutation.workspace, op, &format!("l{i}"));
        }
        for (i, op) in mutation.proofs.into_iter().enumerate() {
            query = proofs.build_op_query(query, op, &format!("p{i}"));
        }
        for (i, entry) in mutation.activities.into_iter().enumerate() {
            query = activities.build_create_query(query, entry, &format!("a{i}"));
        }

        query = query
            .query(format!("
                LET $_b_after = (SELECT * FROM $_b_id)[0];
                IF ($_b_after.assignee != NONE) != ($_b_after.status INSIDE $_b_assignee_statuses) {{
                    THROW \"{THROW_PREFIX_INVALID_STATE}Assignee does not match bounty status\"
                }};
            "))
            .bind(("_b_assignee_statuses", assignee_statuses()));
        query = query.query("COMMIT TRANSACTION;");

        let mut res = query
            .await
            .map_err(|e| self.ctx.to_ctx_error(map_query_error(e, on_conflict.clone())))?;
        check_transaction_custom_error(&mut res, on_conflict).map_err(|e| {
            warn!(bounty = %mutation.bounty, error = %e, "bounty mutation rejected");
            self.ctx.to_ctx_error(e)
        })?;

        let bounty = self.fetch(&mutation.bounty).await?;
        bounty.ok_or_else(|| {
            self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                ident: "Bounty".to_string(),
            })
        })
    }

    /// Non deleted bounties of a workspace, newest first, with the total count.
    pub async fn list(
        &self,
        workspace: &Thing,
        filter: BountyFilter,
        pagination: &Pagination,
    ) -> CtxResult<(Vec<Bounty>, u64)> {
        let mut conditions = vec!["workspace = $workspace", "deleted_at = NONE"];
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.assignee.is_some() {
            conditions.push("assignee = $assignee");
        }
        let where_str = conditions.join(" AND ");
        let qry = format!(
            "SELECT * FROM {TABLE_NAME} WHERE {where_str}{};
            SELECT count() AS total FROM {TABLE_NAME} WHERE {where_str} GROUP ALL;",
            pagination.to_query_str()
        );

        let mut res = self
            .db
            .query(qry)
            .bind(("workspace", workspace.clone()))
            .bind(("status", filter.status.map(|s| s.to_string())))
            .bind(("assignee", filter.assignee))
            .await?;
        let list: Vec<Bounty> = res.take(0)?;
        let total: Option<i64> = res.take((1, "total"))?;
        Ok((list, total.unwrap_or(0).max(0) as u64))
    }
}
