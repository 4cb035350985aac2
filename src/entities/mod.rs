pub mod bounty;
pub mod user;
pub mod workspace;
