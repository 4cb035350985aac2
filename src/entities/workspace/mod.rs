pub mod workspace_budget_entity;
pub mod workspace_entity;
pub mod workspace_member_entity;
