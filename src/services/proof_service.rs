use serde::Deserialize;
use serde_json::json;
use surrealdb::sql::Thing;
use tracing::info;
use validator::Validate;

use crate::access::bounty::{can_delete_proof, BountyAction};
use crate::database::client::Db;
use crate::entities::bounty::bounty_activity_entity::{ActivityEntry, BountyActivityAction};
use crate::entities::bounty::bounty_entity::{Bounty, BountyDbService, BountyMutation};
use crate::entities::bounty::bounty_proof_entity::{
    BountyProof, BountyProofDbService, ProofOp, ProofStatus, THROW_ACCEPTED_PROOF,
    THROW_ALREADY_REVIEWED, THROW_PENDING_EXISTS,
};
use crate::entities::bounty::bounty_status::BountyStatus;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::models::view::record_key;
use crate::services::bounty_service::{load_caller_bounty, require, require_status};
use crate::utils::validate_utils::trim_string;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofInput {
    #[serde(deserialize_with = "trim_string")]
    #[validate(url(message = "Proof url must be a valid url"))]
    pub proof_url: String,
    #[serde(deserialize_with = "trim_string")]
    #[validate(length(min = 1, max = 10000, message = "Description must have 1 to 10000 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewProofInput {
    pub approved: bool,
    #[validate(length(max = 10000, message = "Max 10000 characters"))]
    pub feedback: Option<String>,
}

pub struct ProofService<'a> {
    db: &'a Db,
    ctx: &'a Ctx,
    bounties_repository: BountyDbService<'a>,
    proofs_repository: BountyProofDbService<'a>,
}

impl<'a> ProofService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            db,
            ctx,
            bounties_repository: BountyDbService { db, ctx },
            proofs_repository: BountyProofDbService { db, ctx },
        }
    }

    pub async fn list(&self, bounty_id: &Thing) -> CtxResult<Vec<BountyProof>> {
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        self.proofs_repository.list_by_bounty(&loaded.bounty.id).await
    }

    /// The assignee hands in work; the bounty moves to IN_REVIEW.
    pub async fn submit(
        &self,
        bounty_id: &Thing,
        data: SubmitProofInput,
    ) -> CtxResult<(BountyProof, Bounty)> {
        data.validate()?;
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        require(self.ctx, &loaded, BountyAction::SubmitProof)?;
        let bounty = &loaded.bounty;
        require_status(self.ctx, bounty, &[BountyStatus::Assigned])?;
        if self.proofs_repository.find_pending(&bounty.id).await?.is_some() {
            return Err(self.ctx.to_ctx_error(AppError::Conflict {
                description: THROW_PENDING_EXISTS.to_string(),
            }));
        }

        let proof_id = BountyProofDbService::new_proof_id();
        let mutation = BountyMutation::new(bounty)
            .walk(bounty.status, &[BountyStatus::InReview], bounty.amount)
            .map_err(|e| self.ctx.to_ctx_error(e))?
            .with_proof(ProofOp::Submit {
                id: proof_id.clone(),
                submitter: loaded.caller.clone(),
                proof_url: data.proof_url.clone(),
                description: data.description,
            })
            .with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::ProofSubmitted,
                json!({ "proofId": record_key(&proof_id), "proofUrl": data.proof_url }),
            ));

        let bounty = self.bounties_repository.apply(mutation).await?;
        let proof = self.proofs_repository.get(&proof_id).await?;
        info!(bounty = %bounty.id, proof = %proof.id, "proof submitted");
        Ok((proof, bounty))
    }

    /// Accepting leaves the bounty IN_REVIEW until it is completed; rejecting
    /// hands it back to the assignee.
    pub async fn review(
        &self,
        bounty_id: &Thing,
        proof_id: &Thing,
        data: ReviewProofInput,
    ) -> CtxResult<(BountyProof, Bounty)> {
        data.validate()?;
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        require(self.ctx, &loaded, BountyAction::Review)?;
        let bounty = &loaded.bounty;

        let proof = self.get_bounty_proof(bounty, proof_id).await?;
        if proof.status.is_reviewed() {
            return Err(self.ctx.to_ctx_error(AppError::Conflict {
                description: THROW_ALREADY_REVIEWED.to_string(),
            }));
        }
        require_status(self.ctx, bounty, &[BountyStatus::InReview])?;

        let status = if data.approved {
            ProofStatus::Accepted
        } else {
            ProofStatus::Rejected
        };
        let notes = data
            .feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());

        let mut mutation = BountyMutation::new(bounty);
        if !data.approved {
            mutation = mutation
                .walk(bounty.status, &[BountyStatus::Assigned], bounty.amount)
                .map_err(|e| self.ctx.to_ctx_error(e))?;
        }
        let mutation = mutation
            .with_proof(ProofOp::Review {
                id: proof.id.clone(),
                status,
                reviewer: loaded.caller.clone(),
                notes: notes.clone(),
            })
            .with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::ProofReviewed,
                json!({ "proofId": record_key(&proof.id), "status": status, "feedback": notes }),
            ));

        let bounty = self.bounties_repository.apply(mutation).await?;
        let proof = self.proofs_repository.get(&proof.id).await?;
        info!(bounty = %bounty.id, proof = %proof.id, status = %status, "proof reviewed");
        Ok((proof, bounty))
    }

    /// Withdraws a proof that was not accepted. A bounty waiting on the
    /// removed proof goes back to ASSIGNED.
    pub async fn delete(&self, bounty_id: &Thing, proof_id: &Thing) -> CtxResult<Bounty> {
        let loaded = load_caller_bounty(self.db, self.ctx, bounty_id).await?;
        let bounty = &loaded.bounty;
        let proof = self.get_bounty_proof(bounty, proof_id).await?;

        if !can_delete_proof(&loaded.actor, proof.submitter == loaded.caller) {
            return Err(self.ctx.to_ctx_error(AppError::Forbidden));
        }
        if proof.status == ProofStatus::Accepted {
            return Err(self.ctx.to_ctx_error(AppError::Validation {
                description: THROW_ACCEPTED_PROOF.to_string(),
            }));
        }

        let mut mutation = BountyMutation::new(bounty);
        if proof.status == ProofStatus::Pending && bounty.status == BountyStatus::InReview {
            mutation = mutation
                .walk(bounty.status, &[BountyStatus::Assigned], bounty.amount)
                .map_err(|e| self.ctx.to_ctx_error(e))?;
        }
        let mutation = mutation
            .with_proof(ProofOp::Delete {
                id: proof.id.clone(),
            })
            .with_activity(ActivityEntry::new(
                &loaded.caller,
                BountyActivityAction::ProofDeleted,
                json!({ "proofId": record_key(&proof.id), "status": proof.status }),
            ));

        let bounty = self.bounties_repository.apply(mutation).await?;
        info!(bounty = %bounty.id, proof = %proof.id, "proof deleted");
        Ok(bounty)
    }

    async fn get_bounty_proof(&self, bounty: &Bounty, proof_id: &Thing) -> CtxResult<BountyProof> {
        let proof = self.proofs_repository.get(proof_id).await?;
        if proof.bounty != bounty.id {
            return Err(self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                ident: "Proof".to_string(),
            }));
        }
        Ok(proof)
    }
}
