pub mod bounties;
pub mod users;
pub mod workspaces;
