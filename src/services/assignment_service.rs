use serde::Deserialize;
use serde_json::json;
use surrealdb::sql::Thing;
use tracing::info;
use validator::Validate;

use crate::access::bounty::BountyAction;
use crate::database::client::Db;
use crate::entities::bounty::bounty_activity_entity::{ActivityEntry, BountyActivityAction};
use crate::entities::bounty::bounty_entity::{
    AssigneeChange, Bounty, BountyDbService, BountyMutation,
};
use crate::entities::bounty::bounty_proof_entity::ProofOp;
use crate::entities::bounty::bounty_status::BountyStatus;
use crate::entities::user::local_user_entity::{LocalUser, LocalUserDbService};
use crate::entities::workspace::workspace_budget_entity::{LedgerOp, WorkspaceBudgetDbService};
use crate::entities::workspace::workspace_member_entity::WorkspaceMemberDbService;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::models::view::record_key;
use crate::services::bounty_service::{load_caller_bounty, require, require_status, CallerBounty};
use crate::utils::validate_utils::{lowercase_string, validate_pubkey};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignInput {
    #[serde(deserialize_with = "lowercase_string")]
    #[validate(custom(function = validate_pubkey))]
    pub assignee_pubkey: String,
}

pub struct AssignmentService<'a> {
    db: &'a Db,
    ctx: &'a Ctx,
    bounties_repository: BountyDbService<'a>,
    users_repository: LocalUserDbService<'a>,
    members_repository: WorkspaceMemberDbService<'a>,
    budgets_repository: WorkspaceBudgetDbService<'a>,
}

impl<'a> AssignmentService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            db,
            ctx,
            bounties_repository: BountyDbService { db, ctx },
            users_repository: LocalUserDbService { db, ctx },
            members_repository: WorkspaceMemberDbService { db, ctx },
            budgets_repository: WorkspaceBudgetDbService { db, ctx },
        }
    }

    /// Admin directed assignment of an OPEN bounty to a workspace member.
    pub async fn assign(
        &self,
        bounty_id: &Thing,
        data: AssignInput,
    ) -> CtxResult<(Bounty, Option<LocalUser>)> {
        data.validate()?;
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        let mutation = BountyMutation::new(&loaded.bounty);
        let mutation = self
            .plan_assign(&loaded, mutation, &data.assignee_pubkey)
            .await?;
        let bounty = self.bounties_repository.apply(mutation).await?;
        info!(bounty = %bounty.id, assignee = %data.assignee_pubkey, "bounty assigned");
        let assignee = self.users_repository.find(&data.assignee_pubkey).await?;
        Ok((bounty, assignee))
    }

    /// Self assignment by a contributing member.
    pub async fn claim(&self, bounty: &Bounty) -> CtxResult<(Bounty, Option<LocalUser>)> {
        let loaded = load_caller_bounty(self.db, self.ctx, &bounty.id).await?;
        require(self.ctx, &loaded, BountyAction::Claim)?;
        let bounty = &loaded.bounty;
        require_status(self.ctx, bounty, &[BountyStatus::Open])?;
        self.check_budget(bounty).await?;

        let caller_key = record_key(&loaded.caller);
        let mutation = BountyMutation::new(bounty)
            .walk(bounty.status, &[BountyStatus::Assigned], bounty.amount)
            .map_err(|e| self.ctx.to_ctx_error(e))?
            .with_assignee(AssigneeChange::Set(loaded.caller.clone()))
            .with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::Claimed,
                json!({ "assignee": caller_key, "amount": bounty.amount }),
            ));
        let claimed = self.bounties_repository.apply(mutation).await?;
        info!(bounty = %claimed.id, assignee = %caller_key, "bounty claimed");
        let assignee = self.users_repository.find(&caller_key).await?;
        Ok((claimed, assignee))
    }

    pub async fn unassign(&self, bounty_id: &Thing) -> CtxResult<Bounty> {
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        let mutation = BountyMutation::new(&loaded.bounty);
        let mutation = self.plan_unassign(&loaded, mutation)?;
        let bounty = self.bounties_repository.apply(mutation).await?;
        info!(bounty = %bounty.id, "bounty unassigned");
        Ok(bounty)
    }

    /// Checks run in order, each failing with its own error: assignee exists,
    /// assignee is a member, bounty is OPEN, budget covers the amount.
    pub(crate) async fn plan_assign(
        &self,
        loaded: &CallerBounty,
        mutation: BountyMutation,
        assignee_pubkey: &str,
    ) -> CtxResult<BountyMutation> {
        require(self.ctx, loaded, BountyAction::Assign)?;
        let bounty = &loaded.bounty;
        let assignee_pubkey = assignee_pubkey.trim().to_lowercase();

        if !self.users_repository.exists(&assignee_pubkey).await? {
            return Err(self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                ident: "Assignee".to_string(),
            }));
        }
        let assignee = LocalUserDbService::get_user_id(&assignee_pubkey);
        if self
            .members_repository
            .find(&bounty.workspace, &assignee)
            .await?
            .is_none()
        {
            return Err(self.ctx.to_ctx_error(AppError::AuthorizationFail {
                required: "Assignee must be a workspace member".to_string(),
            }));
        }
        require_status(self.ctx, bounty, &[BountyStatus::Open])?;
        self.check_budget(bounty).await?;

        Ok(mutation
            .walk(bounty.status, &[BountyStatus::Assigned], bounty.amount)
            .map_err(|e| self.ctx.to_ctx_error(e))?
            .with_assignee(AssigneeChange::Set(assignee))
            .with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::Assigned,
                json!({ "assignee": assignee_pubkey, "amount": bounty.amount }),
            )))
    }

    /// Back to OPEN with the reservation released. From IN_REVIEW the
    /// outstanding proof is rejected on the way.
    pub(crate) fn plan_unassign(
        &self,
        loaded: &CallerBounty,
        mutation: BountyMutation,
    ) -> CtxResult<BountyMutation> {
        require(self.ctx, loaded, BountyAction::Unassign)?;
        let bounty = &loaded.bounty;
        let path: &[BountyStatus] = match bounty.status {
            BountyStatus::Assigned => &[BountyStatus::Open],
            BountyStatus::InReview => &[BountyStatus::Assigned, BountyStatus::Open],
            _ => {
                return Err(self.ctx.to_ctx_error(AppError::Conflict {
                    description: "Bounty is not assigned".to_string(),
                }))
            }
        };

        let mut mutation = mutation
            .walk(bounty.status, path, bounty.amount)
            .map_err(|e| self.ctx.to_ctx_error(e))?;
        if bounty.status == BountyStatus::InReview {
            mutation = mutation.with_proof(ProofOp::RejectPending {
                reviewer: loaded.caller.clone(),
                notes: "Assignee removed".to_string(),
            });
        }
        Ok(mutation.with_activity(ActivityEntry::new(
            &loaded.caller,
            BountyActivityAction::Unassigned,
            json!({ "assignee": bounty.assignee.as_ref().map(record_key) }),
        )))
    }

    async fn check_budget(&self, bounty: &Bounty) -> CtxResult<()> {
        let budget = self
            .budgets_repository
            .get_by_workspace(&bounty.workspace)
            .await?;
        budget
            .balance()
            .apply(LedgerOp::Reserve(bounty.amount))
            .map(|_| ())
            .map_err(|e| self.ctx.to_ctx_error(e))
    }
}
