use serde::Deserialize;
use serde_json::json;
use surrealdb::sql::Thing;
use tracing::info;
use validator::Validate;

use crate::access::bounty::{BountyAction, BountyActor};
use crate::access::workspace_role::WorkspaceRole;
use crate::database::client::Db;
use crate::entities::bounty::bounty_activity_entity::{
    ActivityEntry, BountyActivity, BountyActivityAction, BountyActivityDbService,
};
use crate::entities::bounty::bounty_entity::{
    Bounty, BountyChanges, BountyCreate, BountyDbService, BountyFilter, BountyMutation,
};
use crate::entities::bounty::bounty_proof_entity::{BountyProofDbService, ProofOp};
use crate::entities::bounty::bounty_status::BountyStatus;
use crate::entities::user::local_user_entity::LocalUserDbService;
use crate::entities::workspace::workspace_budget_entity::{LedgerOp, WorkspaceBudgetDbService};
use crate::entities::workspace::workspace_entity::WorkspaceDbService;
use crate::entities::workspace::workspace_member_entity::WorkspaceMemberDbService;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::middleware::utils::db_utils::Pagination;
use crate::middleware::utils::extractor_utils::PaginationParams;
use crate::services::assignment_service::AssignmentService;
use crate::services::workspace_service::require_role;
use crate::utils::validate_utils::{
    normalize_tags, trim_present_string, trim_string, trim_string_opt, validate_pubkey,
    validate_tags,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBountyInput {
    #[serde(deserialize_with = "trim_string")]
    #[validate(length(min = 1, max = 200, message = "Title must have 1 to 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 10000, message = "Max 10000 characters"))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 10000, message = "Max 10000 characters"))]
    pub deliverables: String,
    #[validate(range(min = 1, max = 2_100_000_000_000_000_u64, message = "Amount must be a positive integer"))]
    pub amount: u64,
    #[serde(default)]
    #[validate(length(max = 20, message = "Max 20 tags"), custom(function = validate_tags))]
    pub tags: Vec<String>,
    #[validate(range(min = 1, max = 10000))]
    pub estimated_hours: Option<u32>,
    #[serde(default, deserialize_with = "trim_string_opt")]
    #[validate(url(message = "Github issue url must be a valid url"))]
    pub github_issue_url: Option<String>,
    pub status: Option<BountyStatus>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBountyInput {
    #[serde(default, deserialize_with = "trim_present_string")]
    #[validate(length(min = 1, max = 200, message = "Title must have 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 10000, message = "Max 10000 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 10000, message = "Max 10000 characters"))]
    pub deliverables: Option<String>,
    #[validate(range(min = 1, max = 2_100_000_000_000_000_u64, message = "Amount must be a positive integer"))]
    pub amount: Option<u64>,
    #[validate(length(max = 20, message = "Max 20 tags"), custom(function = validate_tags))]
    pub tags: Option<Vec<String>>,
    #[validate(range(min = 1, max = 10000))]
    pub estimated_hours: Option<u32>,
    #[validate(url(message = "Github issue url must be a valid url"))]
    pub github_issue_url: Option<String>,
    pub status: Option<BountyStatus>,
    #[validate(custom(function = validate_pubkey))]
    pub assignee_pubkey: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BountyListQuery {
    pub status: Option<BountyStatus>,
    pub assignee: Option<String>,
    pub start: Option<u32>,
    pub count: Option<u32>,
}

/// A bounty as seen by the calling user.
pub struct CallerBounty {
    pub bounty: Bounty,
    pub caller: Thing,
    pub actor: BountyActor,
}

impl CallerBounty {
    pub fn can(&self, action: BountyAction) -> bool {
        self.actor.can(action, self.bounty.status)
    }
}

/// Loads the bounty and the caller's relation to it. Outsiders get Forbidden.
pub(crate) async fn load_caller_bounty(
    db: &Db,
    ctx: &Ctx,
    bounty_id: &Thing,
) -> CtxResult<CallerBounty> {
    let pubkey = ctx.user_pubkey()?;
    let caller = LocalUserDbService::get_user_id(&pubkey);
    let bounty = BountyDbService { db, ctx }.get(bounty_id).await?;
    let role = WorkspaceMemberDbService { db, ctx }
        .get_role(&bounty.workspace, &caller)
        .await?;
    let actor = BountyActor {
        role,
        is_creator: bounty.creator == caller,
        is_assignee: bounty.is_assignee(&caller),
    };
    if !actor.is_member() {
        return Err(ctx.to_ctx_error(AppError::Forbidden));
    }
    Ok(CallerBounty {
        bounty,
        caller,
        actor,
    })
}

pub(crate) fn require(ctx: &Ctx, loaded: &CallerBounty, action: BountyAction) -> CtxResult<()> {
    if loaded.can(action) {
        Ok(())
    } else {
        Err(ctx.to_ctx_error(AppError::Forbidden))
    }
}

pub(crate) fn require_status(
    ctx: &Ctx,
    bounty: &Bounty,
    allowed: &[BountyStatus],
) -> CtxResult<()> {
    if allowed.contains(&bounty.status) {
        return Ok(());
    }
    let names = allowed
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(ctx.to_ctx_error(AppError::Validation {
        description: format!("Bounty status must be {names}"),
    }))
}

pub struct BountyService<'a> {
    db: &'a Db,
    ctx: &'a Ctx,
    bounties_repository: BountyDbService<'a>,
    workspaces_repository: WorkspaceDbService<'a>,
    members_repository: WorkspaceMemberDbService<'a>,
    budgets_repository: WorkspaceBudgetDbService<'a>,
    proofs_repository: BountyProofDbService<'a>,
    activities_repository: BountyActivityDbService<'a>,
}

impl<'a> BountyService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            db,
            ctx,
            bounties_repository: BountyDbService { db, ctx },
            workspaces_repository: WorkspaceDbService { db, ctx },
            members_repository: WorkspaceMemberDbService { db, ctx },
            budgets_repository: WorkspaceBudgetDbService { db, ctx },
            proofs_repository: BountyProofDbService { db, ctx },
            activities_repository: BountyActivityDbService { db, ctx },
        }
    }

    pub async fn create(&self, workspace_id: &Thing, data: CreateBountyInput) -> CtxResult<Bounty> {
        data.validate()?;
        let pubkey = self.ctx.user_pubkey()?;
        let caller = LocalUserDbService::get_user_id(&pubkey);
        self.workspaces_repository.get(workspace_id).await?;
        require_role(
            &self.members_repository,
            self.ctx,
            workspace_id,
            &caller,
            WorkspaceRole::Admin,
        )
        .await?;

        let status = data.status.unwrap_or(BountyStatus::Draft);
        if !matches!(status, BountyStatus::Draft | BountyStatus::Open) {
            return Err(self.ctx.to_ctx_error(AppError::Validation {
                description: "Bounty can only be created as DRAFT or OPEN".to_string(),
            }));
        }

        let activity = ActivityEntry::new(
            &caller,
            BountyActivityAction::Created,
            json!({ "status": status, "amount": data.amount }),
        );
        self.bounties_repository
            .create(
                BountyCreate {
                    workspace: workspace_id.clone(),
                    creator: caller,
                    title: data.title,
                    description: data.description,
                    deliverables: data.deliverables,
                    amount: data.amount,
                    status,
                    tags: normalize_tags(data.tags),
                    estimated_hours: data.estimated_hours,
                    github_issue_url: data.github_issue_url,
                },
                activity,
            )
            .await
    }

    pub async fn get(&self, bounty_id: &Thing) -> CtxResult<Bounty> {
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        Ok(loaded.bounty)
    }

    pub async fn list(
        &self,
        workspace_id: &Thing,
        query: BountyListQuery,
        default_count: u32,
        max_count: u32,
    ) -> CtxResult<(Vec<Bounty>, u64, Pagination)> {
        let pubkey = self.ctx.user_pubkey()?;
        let caller = LocalUserDbService::get_user_id(&pubkey);
        self.workspaces_repository.get(workspace_id).await?;
        require_role(
            &self.members_repository,
            self.ctx,
            workspace_id,
            &caller,
            WorkspaceRole::Viewer,
        )
        .await?;

        let assignee = match query.assignee {
            Some(ref pubkey) if !pubkey.trim().is_empty() => Some(LocalUserDbService::get_user_id(
                &pubkey.trim().to_lowercase(),
            )),
            _ => None,
        };
        let pagination = PaginationParams {
            start: query.start,
            count: query.count,
        }
        .to_pagination("created_at", default_count, max_count);

        let (list, total) = self
            .bounties_repository
            .list(
                workspace_id,
                BountyFilter {
                    status: query.status,
                    assignee,
                },
                &pagination,
            )
            .await?;
        Ok((list, total, pagination))
    }

    pub async fn activities(&self, bounty_id: &Thing) -> CtxResult<Vec<BountyActivity>> {
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        self.activities_repository
            .list_by_bounty(&loaded.bounty.id)
            .await
    }

    /// Field edits and status changes through `PATCH`.
    pub async fn update(&self, bounty_id: &Thing, data: UpdateBountyInput) -> CtxResult<Bounty> {
        data.validate()?;
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        let bounty = &loaded.bounty;

        let changes = BountyChanges {
            title: data.title,
            description: data.description,
            deliverables: data.deliverables,
            tags: data.tags.map(normalize_tags),
            estimated_hours: data.estimated_hours,
            github_issue_url: data.github_issue_url,
            amount: data.amount.filter(|a| *a != bounty.amount),
        };
        let target = data.status.filter(|s| *s != bounty.status);

        if changes.is_empty() && target.is_none() {
            return Err(self.ctx.to_ctx_error(AppError::Validation {
                description: "No changes provided".to_string(),
            }));
        }
        if changes.amount.is_some() && target.is_some() {
            return Err(self.ctx.to_ctx_error(AppError::Validation {
                description: "Amount and status cannot change in the same request".to_string(),
            }));
        }

        let mut mutation = BountyMutation::new(bounty);
        if !changes.is_empty() {
            mutation = self.plan_edit(&loaded, mutation, changes).await?;
        }
        if let Some(target) = target {
            mutation = self
                .plan_status_change(&loaded, mutation, target, data.assignee_pubkey)
                .await?;
        }
        let updated = self.bounties_repository.apply(mutation).await?;
        info!(bounty = %updated.id, status = %updated.status, "bounty updated");
        Ok(updated)
    }

    async fn plan_edit(
        &self,
        loaded: &CallerBounty,
        mut mutation: BountyMutation,
        changes: BountyChanges,
    ) -> CtxResult<BountyMutation> {
        let bounty = &loaded.bounty;
        if bounty.status.is_terminal() {
            return Err(self.ctx.to_ctx_error(AppError::Conflict {
                description: format!("Bounty is {} and can no longer be edited", bounty.status),
            }));
        }
        let edits_fields = BountyChanges {
            amount: None,
            ..changes.clone()
        };
        if !edits_fields.is_empty() {
            require(self.ctx, loaded, BountyAction::Edit)?;
            let fields = [
                ("title", edits_fields.title.is_some()),
                ("description", edits_fields.description.is_some()),
                ("deliverables", edits_fields.deliverables.is_some()),
                ("tags", edits_fields.tags.is_some()),
                ("estimatedHours", edits_fields.estimated_hours.is_some()),
                ("githubIssueUrl", edits_fields.github_issue_url.is_some()),
            ]
            .into_iter()
            .filter_map(|(name, changed)| changed.then_some(name))
            .collect::<Vec<_>>();
            mutation = mutation.with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::Updated,
                json!({ "fields": fields }),
            ));
        }

        if let Some(amount) = changes.amount {
            require(self.ctx, loaded, BountyAction::ChangeAmount)?;
            if !bounty.status.allows_amount_change() {
                return Err(self.ctx.to_ctx_error(AppError::Conflict {
                    description: format!("Amount cannot change while bounty is {}", bounty.status),
                }));
            }
            if bounty.status.holds_reservation() {
                if let Some(op) = LedgerOp::for_amount_change(bounty.amount, amount) {
                    let budget = self
                        .budgets_repository
                        .get_by_workspace(&bounty.workspace)
                        .await?;
                    budget
                        .balance()
                        .apply(op)
                        .map_err(|e| self.ctx.to_ctx_error(e))?;
                    mutation = mutation.with_ledger(op);
                }
            }
            mutation = mutation.with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::AmountChanged,
                json!({ "from": bounty.amount, "to": amount }),
            ));
        }
        Ok(mutation.with_changes(changes))
    }

    async fn plan_status_change(
        &self,
        loaded: &CallerBounty,
        mutation: BountyMutation,
        target: BountyStatus,
        assignee_pubkey: Option<String>,
    ) -> CtxResult<BountyMutation> {
        let bounty = &loaded.bounty;
        let from = bounty.status;
        from.transition_to(target)
            .map_err(|e| self.ctx.to_ctx_error(e))?;

        let status_activity = |action: BountyActivityAction| {
            ActivityEntry::new(
                &loaded.caller,
                action,
                json!({ "from": from, "to": target }),
            )
        };

        let mutation = match (from, target) {
            (BountyStatus::Draft, BountyStatus::Open) => {
                require(self.ctx, loaded, BountyAction::Publish)?;
                mutation
                    .walk(from, &[target], bounty.amount)
                    .map_err(|e| self.ctx.to_ctx_error(e))?
                    .with_activity(status_activity(BountyActivityAction::StatusChanged))
            }
            (BountyStatus::Assigned, BountyStatus::Open) => {
                AssignmentService::new(self.db, self.ctx).plan_unassign(loaded, mutation)?
            }
            (BountyStatus::Open, BountyStatus::Assigned) => {
                let assignee_pubkey = assignee_pubkey.ok_or_else(|| {
                    self.ctx.to_ctx_error(AppError::Validation {
                        description: "assigneePubkey is required to assign a bounty".to_string(),
                    })
                })?;
                AssignmentService::new(self.db, self.ctx)
                    .plan_assign(loaded, mutation, &assignee_pubkey)
                    .await?
            }
            (BountyStatus::InReview, BountyStatus::Assigned) => {
                require(self.ctx, loaded, BountyAction::Review)?;
                mutation
                    .walk(from, &[target], bounty.amount)
                    .map_err(|e| self.ctx.to_ctx_error(e))?
                    .with_proof(ProofOp::RejectPending {
                        reviewer: loaded.caller.clone(),
                        notes: "Sent back for changes".to_string(),
                    })
                    .with_activity(status_activity(BountyActivityAction::StatusChanged))
            }
            (_, BountyStatus::InReview) => {
                return Err(self.ctx.to_ctx_error(AppError::Validation {
                    description: "Bounty enters IN_REVIEW only by submitting a proof".to_string(),
                }));
            }
            (_, BountyStatus::Cancelled) => {
                require(self.ctx, loaded, BountyAction::Cancel)?;
                let mut mutation = mutation
                    .walk(from, &[target], bounty.amount)
                    .map_err(|e| self.ctx.to_ctx_error(e))?;
                if from.holds_reservation() {
                    mutation = mutation.with_proof(ProofOp::RejectPending {
                        reviewer: loaded.caller.clone(),
                        notes: "Bounty cancelled".to_string(),
                    });
                }
                mutation.with_activity(status_activity(BountyActivityAction::Cancelled))
            }
            (BountyStatus::InReview, BountyStatus::Paid) => {
                require(self.ctx, loaded, BountyAction::Pay)?;
                self.require_accepted_proof(bounty).await?;
                mutation
                    .walk(from, &[target], bounty.amount)
                    .map_err(|e| self.ctx.to_ctx_error(e))?
                    .with_activity(status_activity(BountyActivityAction::Paid))
            }
            (BountyStatus::Paid, BountyStatus::Completed) => {
                require(self.ctx, loaded, BountyAction::Complete)?;
                mutation
                    .walk(from, &[target], bounty.amount)
                    .map_err(|e| self.ctx.to_ctx_error(e))?
                    .with_activity(status_activity(BountyActivityAction::Completed))
            }
            _ => {
                return Err(self.ctx.to_ctx_error(AppError::InvalidTransition {
                    from: from.to_string(),
                    to: target.to_string(),
                }))
            }
        };
        Ok(mutation)
    }

    async fn require_accepted_proof(&self, bounty: &Bounty) -> CtxResult<()> {
        let accepted = match bounty.assignee {
            Some(ref assignee) => {
                self.proofs_repository
                    .latest_accepted_from(&bounty.id, assignee)
                    .await?
            }
            None => false,
        };
        if accepted {
            Ok(())
        } else {
            Err(self.ctx.to_ctx_error(AppError::Validation {
                description: "An accepted proof from the assignee is required".to_string(),
            }))
        }
    }

    /// Settles and closes a reviewed bounty: `IN_REVIEW -> PAID -> COMPLETED`,
    /// or only the last edge when it was paid already.
    pub async fn complete(&self, bounty_id: &Thing) -> CtxResult<Bounty> {
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        require(self.ctx, &loaded, BountyAction::Complete)?;
        let bounty = &loaded.bounty;
        require_status(
            self.ctx,
            bounty,
            &[BountyStatus::InReview, BountyStatus::Paid],
        )?;
        self.require_accepted_proof(bounty).await?;

        let path: &[BountyStatus] = match bounty.status {
            BountyStatus::InReview => &[BountyStatus::Paid, BountyStatus::Completed],
            _ => &[BountyStatus::Completed],
        };
        let mut mutation = BountyMutation::new(bounty)
            .walk(bounty.status, path, bounty.amount)
            .map_err(|e| self.ctx.to_ctx_error(e))?;
        if bounty.status == BountyStatus::InReview {
            mutation = mutation.with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::Paid,
                json!({ "amount": bounty.amount }),
            ));
        }
        mutation = mutation.with_activity(ActivityEntry::new(
            &loaded.caller,
            BountyActivityAction::Completed,
            json!({ "amount": bounty.amount }),
        ));

        let completed = self.bounties_repository.apply(mutation).await?;
        info!(bounty = %completed.id, amount = completed.amount, "bounty completed");
        Ok(completed)
    }

    /// Soft delete, only before work started or after cancellation.
    pub async fn delete(&self, bounty_id: &Thing) -> CtxResult<Bounty> {
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        require(self.ctx, &loaded, BountyAction::Delete)?;
        let bounty = &loaded.bounty;
        if !bounty.status.is_deletable() {
            return Err(self.ctx.to_ctx_error(AppError::Conflict {
                description: format!("Bounty cannot be deleted while {}", bounty.status),
            }));
        }
        let mutation = BountyMutation::new(bounty)
            .soft_delete()
            .with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::Deleted,
                json!({ "status": bounty.status }),
            ));
        let deleted = self.bounties_repository.apply(mutation).await?;
        info!(bounty = %deleted.id, "bounty deleted");
        Ok(deleted)
    }

    /// Looks up a bounty through its workspace path.
    pub async fn get_in_workspace(&self, workspace_id: &Thing, bounty_id: &Thing) -> CtxResult<Bounty> {
        let bounty = self.bounties_repository.get(bounty_id).await?;
        if bounty.workspace != *workspace_id {
            return Err(self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                ident: "Bounty".to_string(),
            }));
        }
        Ok(bounty)
    }
}
