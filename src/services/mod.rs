pub mod assignment_service;
pub mod bounty_service;
pub mod proof_service;
pub mod user_service;
pub mod workspace_service;
