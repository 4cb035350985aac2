use crate::access::workspace_role::{member_has_at_least_role, WorkspaceRole};
use crate::entities::bounty::bounty_status::BountyStatus;

/// What the caller is relative to one bounty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BountyActor {
    pub role: Option<WorkspaceRole>,
    pub is_creator: bool,
    pub is_assignee: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BountyAction {
    View,
    Edit,
    ChangeAmount,
    Publish,
    Assign,
    Claim,
    Unassign,
    SubmitProof,
    Review,
    Complete,
    Pay,
    Cancel,
    Delete,
}

impl BountyActor {
    pub fn is_member(&self) -> bool {
        self.role.is_some()
    }

    fn is_admin(&self) -> bool {
        member_has_at_least_role(self.role, WorkspaceRole::Admin)
    }

    pub fn can(&self, action: BountyAction, status: BountyStatus) -> bool {
        match action {
            BountyAction::View => self.is_member(),
            BountyAction::Edit => {
                self.is_admin()
                    || (self.is_creator
                        && self.is_member()
                        && matches!(status, BountyStatus::Draft | BountyStatus::Open))
            }
            BountyAction::Publish => self.is_admin() || (self.is_creator && self.is_member()),
            BountyAction::ChangeAmount | BountyAction::Assign | BountyAction::Unassign => {
                self.is_admin()
            }
            BountyAction::Claim => {
                member_has_at_least_role(self.role, WorkspaceRole::Contributor)
            }
            BountyAction::SubmitProof => self.is_assignee,
            // reviewers never judge their own work
            BountyAction::Review | BountyAction::Complete | BountyAction::Pay => {
                self.is_admin() && !self.is_assignee
            }
            BountyAction::Cancel => match status {
                BountyStatus::Draft | BountyStatus::Open => {
                    self.is_admin() || (self.is_creator && self.is_member())
                }
                _ => self.is_admin(),
            },
            BountyAction::Delete => {
                (self.is_creator && self.is_member())
                    || member_has_at_least_role(self.role, WorkspaceRole::Owner)
            }
        }
    }
}

/// Proofs may be withdrawn by whoever submitted them or by a workspace admin.
pub fn can_delete_proof(actor: &BountyActor, is_submitter: bool) -> bool {
    is_submitter || member_has_at_least_role(actor.role, WorkspaceRole::Admin)
}
