use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Member role inside a workspace. Declaration order is the permission order:
/// `Viewer < Contributor < Admin < Owner`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceRole {
    Viewer,
    Contributor,
    Admin,
    Owner,
}

pub fn has_at_least_role(actual: WorkspaceRole, required: WorkspaceRole) -> bool {
    actual >= required
}

/// Same check for callers that may not be members at all.
pub fn member_has_at_least_role(actual: Option<WorkspaceRole>, required: WorkspaceRole) -> bool {
    actual.is_some_and(|role| has_at_least_role(role, required))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_are_totally_ordered() {
        use WorkspaceRole::*;
        let ordered = [Viewer, Contributor, Admin, Owner];
        for (i, a) in ordered.iter().enumerate() {
            for (j, b) in ordered.iter().enumerate() {
                assert_eq!(has_at_least_role(*a, *b), i >= j, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn non_member_has_no_role() {
        assert!(!member_has_at_least_role(None, WorkspaceRole::Viewer));
        assert!(member_has_at_least_role(
            Some(WorkspaceRole::Owner),
            WorkspaceRole::Admin
        ));
    }

    #[test]
    fn string_form() {
        assert_eq!(WorkspaceRole::Contributor.to_string(), "CONTRIBUTOR");
        assert_eq!(
            WorkspaceRole::from_str("ADMIN").unwrap(),
            WorkspaceRole::Admin
        );
        assert_eq!(
            serde_json::to_string(&WorkspaceRole::Owner).unwrap(),
            "\"OWNER\""
        );
    }
}
