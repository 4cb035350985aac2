pub mod bounty;
pub mod workspace_role;
