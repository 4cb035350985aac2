use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bounty::BountyView;
use super::record_key;
use crate::entities::bounty::bounty_proof_entity::{BountyProof, ProofStatus};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofView {
    pub id: String,
    pub bounty_id: String,
    pub submitter_pubkey: String,
    pub proof_url: String,
    pub description: String,
    pub status: ProofStatus,
    pub reviewer_pubkey: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<BountyProof> for ProofView {
    fn from(proof: BountyProof) -> Self {
        ProofView {
            id: record_key(&proof.id),
            bounty_id: record_key(&proof.bounty),
            submitter_pubkey: record_key(&proof.submitter),
            proof_url: proof.proof_url,
            description: proof.description,
            status: proof.status,
            reviewer_pubkey: proof.reviewer.as_ref().map(record_key),
            review_notes: proof.review_notes,
            created_at: proof.created_at,
            reviewed_at: proof.reviewed_at,
        }
    }
}

/// A proof after a write, with the bounty it affected.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofWithBountyView {
    pub proof: ProofView,
    pub bounty: BountyView,
}
