pub mod bounty_activity_entity;
pub mod bounty_entity;
pub mod bounty_proof_entity;
pub mod bounty_status;
