use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use surrealdb::engine::any::Any;
use surrealdb::method::Query;
use surrealdb::sql::{Id, Thing};

use crate::database::client::Db;
use crate::entities::bounty::bounty_entity;
use crate::entities::user::local_user_entity;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::middleware::utils::db_utils::{
    get_entity, with_not_found_err, IdentIdName, THROW_PREFIX_CONFLICT, THROW_PREFIX_NOT_FOUND,
};

pub const TABLE_NAME: &str = "bounty_proof";
const BOUNTY_TABLE: &str = bounty_entity::TABLE_NAME;
const USER_TABLE: &str = local_user_entity::TABLE_NAME;

pub const THROW_PENDING_EXISTS: &str = "Bounty already has a proof waiting for review";
pub const THROW_ALREADY_REVIEWED: &str = "Proof has already been reviewed";
pub const THROW_ACCEPTED_PROOF: &str = "Accepted proof cannot be deleted";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofStatus {
    Pending,
    Accepted,
    Rejected,
    ChangesRequested,
}

impl ProofStatus {
    pub fn is_reviewed(self) -> bool {
        self != ProofStatus::Pending
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BountyProof {
    pub id: Thing,
    pub bounty: Thing,
    pub submitter: Thing,
    pub proof_url: String,
    pub description: String,
    pub status: ProofStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<Thing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Proof writes that run inside a bounty mutation.
#[derive(Debug, Clone)]
pub enum ProofOp {
    Submit {
        id: Thing,
        submitter: Thing,
        proof_url: String,
        description: String,
    },
    Review {
        id: Thing,
        status: ProofStatus,
        reviewer: Thing,
        notes: Option<String>,
    },
    /// Closes whatever proof is still waiting for review.
    RejectPending { reviewer: Thing, notes: String },
    Delete { id: Thing },
}

pub struct BountyProofDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

impl<'a> BountyProofDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS bounty ON TABLE {TABLE_NAME} TYPE record<{BOUNTY_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS submitter ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS proof_url ON TABLE {TABLE_NAME} TYPE string READONLY;
    DEFINE FIELD IF NOT EXISTS description ON TABLE {TABLE_NAME} TYPE string READONLY;
    DEFINE FIELD IF NOT EXISTS status ON TABLE {TABLE_NAME} TYPE string ASSERT $value INSIDE ['PENDING', 'ACCEPTED', 'REJECTED', 'CHANGES_REQUESTED'];
    DEFINE FIELD IF NOT EXISTS reviewer ON TABLE {TABLE_NAME} TYPE option<record<{USER_TABLE}>>;
    DEFINE FIELD IF NOT EXISTS review_notes ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() READONLY;
    DEFINE FIELD IF NOT EXISTS reviewed_at ON TABLE {TABLE_NAME} TYPE option<datetime>;
    DEFINE INDEX IF NOT EXISTS bounty_idx ON TABLE {TABLE_NAME} COLUMNS bounty;
    DEFINE INDEX IF NOT EXISTS bounty_status_idx ON TABLE {TABLE_NAME} COLUMNS bounty, status;
    ");
        let mutation = self.db.query(sql).await?;

        mutation.check().expect("should mutate bounty_proof");

        Ok(())
    }

    pub fn new_proof_id() -> Thing {
        Thing::from((TABLE_NAME, Id::ulid()))
    }

    pub async fn get(&self, proof_id: &Thing) -> CtxResult<BountyProof> {
        let opt =
            get_entity::<BountyProof>(self.db, TABLE_NAME, &IdentIdName::Id(proof_id.clone()))
                .await?;
        with_not_found_err(opt, self.ctx, "Proof")
    }

    pub async fn list_by_bounty(&self, bounty: &Thing) -> CtxResult<Vec<BountyProof>> {
        let mut res = self
            .db
            .query(format!(
                "SELECT * FROM {TABLE_NAME} WHERE bounty = $bounty ORDER BY created_at DESC;"
            ))
            .bind(("bounty", bounty.clone()))
            .await?;
        Ok(res.take::<Vec<BountyProof>>(0)?)
    }

    pub async fn find_pending(&self, bounty: &Thing) -> CtxResult<Option<BountyProof>> {
        let mut res = self
            .db
            .query(format!(
                "SELECT * FROM {TABLE_NAME} WHERE bounty = $bounty AND status = $status LIMIT 1;"
            ))
            .bind(("bounty", bounty.clone()))
            .bind(("status", ProofStatus::Pending.to_string()))
            .await?;
        Ok(res.take::<Option<BountyProof>>(0)?)
    }

    /// The most recent proof on the bounty, whoever submitted it.
    pub async fn latest(&self, bounty: &Thing) -> CtxResult<Option<BountyProof>> {
        let mut res = self
            .db
            .query(format!(
                "SELECT * FROM {TABLE_NAME} WHERE bounty = $bounty ORDER BY created_at DESC, id DESC LIMIT 1;"
            ))
            .bind(("bounty", bounty.clone()))
            .await?;
        Ok(res.take::<Option<BountyProof>>(0)?)
    }

    /// True when the latest proof was submitted by `submitter` and accepted.
    /// Acceptances of earlier work or of a previous assignee do not count.
    pub async fn latest_accepted_from(&self, bounty: &Thing, submitter: &Thing) -> CtxResult<bool> {
        Ok(self
            .latest(bounty)
            .await?
            .is_some_and(|p| p.status == ProofStatus::Accepted && p.submitter == *submitter))
    }

    /// Appends one proof write for the bounty bound as `$_b_id`. Each op re-checks
    /// the proof state it relies on.
    pub fn build_op_query<'b>(&self, query: Query<'b, Any>, op: ProofOp, key: &str) -> Query<'b, Any> {
        let p = format!("$_proof_{key}");
        let pending = ProofStatus::Pending.to_string();
        match op {
            ProofOp::Submit {
                id,
                submitter,
                proof_url,
                description,
            } => query
                .query(format!("
                    IF count((SELECT id FROM {TABLE_NAME} WHERE bounty = $_b_id AND status = '{pending}')) > 0 {{
                        THROW \"{THROW_PREFIX_CONFLICT}{THROW_PENDING_EXISTS}\"
                    }};
                    CREATE {p}_id SET bounty = $_b_id, submitter = {p}_submitter,
                        proof_url = {p}_url, description = {p}_description, status = '{pending}';
                "))
                .bind((format!("_proof_{key}_id"), id))
                .bind((format!("_proof_{key}_submitter"), submitter))
                .bind((format!("_proof_{key}_url"), proof_url))
                .bind((format!("_proof_{key}_description"), description)),
            ProofOp::Review {
                id,
                status,
                reviewer,
                notes,
            } => query
                .query(format!("
                    LET {p} = (SELECT * FROM {p}_id)[0];
                    IF {p} == NONE OR {p}.bounty != $_b_id {{ THROW \"{THROW_PREFIX_NOT_FOUND}Proof\" }};
                    IF {p}.status != '{pending}' {{ THROW \"{THROW_PREFIX_CONFLICT}{THROW_ALREADY_REVIEWED}\" }};
                    UPDATE {p}_id SET status = {p}_status, reviewer = {p}_reviewer,
                        review_notes = {p}_notes, reviewed_at = time::now();
                "))
                .bind((format!("_proof_{key}_id"), id))
                .bind((format!("_proof_{key}_status"), status.to_string()))
                .bind((format!("_proof_{key}_reviewer"), reviewer))
                .bind((format!("_proof_{key}_notes"), notes)),
            ProofOp::RejectPending { reviewer, notes } => query
                .query(format!("
                    UPDATE {TABLE_NAME} SET status = '{}', reviewer = {p}_reviewer,
                        review_notes = {p}_notes, reviewed_at = time::now()
                        WHERE bounty = $_b_id AND status = '{pending}';
                ", ProofStatus::Rejected))
                .bind((format!("_proof_{key}_reviewer"), reviewer))
                .bind((format!("_proof_{key}_notes"), notes)),
            ProofOp::Delete { id } => query
                .query(format!("
                    LET {p} = (SELECT * FROM {p}_id)[0];
                    IF {p} == NONE OR {p}.bounty != $_b_id {{ THROW \"{THROW_PREFIX_NOT_FOUND}Proof\" }};
                    IF {p}.status == '{}' {{ THROW \"{THROW_ACCEPTED_PROOF}\" }};
                    DELETE {p}_id;
                ", ProofStatus::Accepted))
                .bind((format!("_proof_{key}_id"), id)),
        }
    }
}
