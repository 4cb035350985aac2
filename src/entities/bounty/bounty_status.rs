use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::entities::workspace::workspace_budget_entity::LedgerOp;
use crate::middleware::error::{AppError, AppResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BountyStatus {
    Draft,
    Open,
    Assigned,
    InReview,
    Completed,
    Paid,
    Cancelled,
}

use BountyStatus::*;

static TRANSITIONS: [(BountyStatus, &[BountyStatus]); 7] = [
    (Draft, &[Open, Cancelled]),
    (Open, &[Assigned, Cancelled]),
    (Assigned, &[Open, InReview, Cancelled]),
    (InReview, &[Assigned, Paid, Cancelled]),
    (Paid, &[Completed]),
    (Completed, &[]),
    (Cancelled, &[]),
];

impl BountyStatus {
    pub const ALL: [BountyStatus; 7] = [Draft, Open, Assigned, InReview, Completed, Paid, Cancelled];

    pub fn allowed_targets(self) -> &'static [BountyStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, to)| *to)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(self, to: BountyStatus) -> bool {
        self.allowed_targets().contains(&to)
    }

    pub fn transition_to(self, to: BountyStatus) -> AppResult<BountyStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(AppError::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Statuses in which the bounty must have an assignee.
    pub fn holds_assignee(self) -> bool {
        matches!(self, Assigned | InReview | Completed | Paid)
    }

    /// Statuses in which the bounty amount sits in the reserved budget.
    pub fn holds_reservation(self) -> bool {
        matches!(self, Assigned | InReview)
    }

    pub fn is_deletable(self) -> bool {
        matches!(self, Draft | Open | Cancelled)
    }

    pub fn allows_amount_change(self) -> bool {
        matches!(self, Draft | Open | Assigned | InReview)
    }
}

/// Timestamp written when a bounty enters a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BountyStamp {
    AssignedAt,
    PaidAt,
    CompletedAt,
}

impl BountyStamp {
    pub fn field(self) -> &'static str {
        match self {
            BountyStamp::AssignedAt => "assigned_at",
            BountyStamp::PaidAt => "paid_at",
            BountyStamp::CompletedAt => "completed_at",
        }
    }
}

/// Side effects bound to one edge of the status table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionEffects {
    pub ledger: Option<LedgerOp>,
    pub stamp: Option<BountyStamp>,
    pub clears_assignee: bool,
}

/// Validates a single edge and returns what it does to the ledger and the bounty.
pub fn transition_effects(
    from: BountyStatus,
    to: BountyStatus,
    amount: u64,
) -> AppResult<TransitionEffects> {
    from.transition_to(to)?;
    let effects = match (from, to) {
        (Open, Assigned) => TransitionEffects {
            ledger: Some(LedgerOp::Reserve(amount)),
            stamp: Some(BountyStamp::AssignedAt),
            clears_assignee: false,
        },
        (Assigned, Open) | (Assigned, Cancelled) | (InReview, Cancelled) => TransitionEffects {
            ledger: Some(LedgerOp::Release(amount)),
            stamp: None,
            clears_assignee: true,
        },
        (InReview, Paid) => TransitionEffects {
            ledger: Some(LedgerOp::Settle(amount)),
            stamp: Some(BountyStamp::PaidAt),
            clears_assignee: false,
        },
        (Paid, Completed) => TransitionEffects {
            stamp: Some(BountyStamp::CompletedAt),
            ..Default::default()
        },
        _ => TransitionEffects::default(),
    };
    Ok(effects)
}

/// Effects of walking several edges in a row, e.g. `IN_REVIEW -> PAID -> COMPLETED`.
pub fn walk_effects(
    from: BountyStatus,
    path: &[BountyStatus],
    amount: u64,
) -> AppResult<Vec<TransitionEffects>> {
    let mut current = from;
    let mut effects = Vec::with_capacity(path.len());
    for next in path {
        effects.push(transition_effects(current, *next, amount)?);
        current = *next;
    }
    Ok(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::workspace::workspace_budget_entity::BudgetBalance;
    use std::str::FromStr;

    #[test]
    fn table_matches_lifecycle() {
        assert!(Draft.can_transition_to(Open));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Open.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(Open));
        assert!(Assigned.can_transition_to(InReview));
        assert!(InReview.can_transition_to(Assigned));
        assert!(InReview.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Completed));

        assert!(!InReview.can_transition_to(Completed));
        assert!(!Open.can_transition_to(InReview));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Paid.is_terminal());
    }

    #[test]
    fn draft_to_completed_names_both_statuses() {
        let err = Draft.transition_to(Completed).unwrap_err();
        assert_eq!(
            err,
            AppError::InvalidTransition {
                from: "DRAFT".to_string(),
                to: "COMPLETED".to_string()
            }
        );
        assert!(err.to_string().contains("DRAFT"));
        assert!(err.to_string().contains("COMPLETED"));
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in BountyStatus::ALL {
            assert!(status.transition_to(status).is_err(), "{status}");
        }
    }

    #[test]
    fn status_names_round_trip() {
        for status in BountyStatus::ALL {
            let name = status.to_string();
            assert_eq!(BountyStatus::from_str(&name).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{name}\""));
        }
        assert_eq!(InReview.to_string(), "IN_REVIEW");
    }

    // Every edge of the table keeps the assignee and reservation invariants
    // when applied to a bounty that satisfied them before.
    #[test]
    fn every_edge_preserves_invariants() {
        let amount = 700;
        for from in BountyStatus::ALL {
            for to in from.allowed_targets() {
                let effects = transition_effects(from, *to, amount).unwrap();

                let had_assignee = from.holds_assignee();
                let has_assignee = if effects.clears_assignee {
                    false
                } else {
                    // entering ASSIGNED from OPEN sets the assignee
                    had_assignee || (from == Open && *to == Assigned)
                };
                assert_eq!(has_assignee, to.holds_assignee(), "{from} -> {to}");

                let mut balance = BudgetBalance::default()
                    .apply(LedgerOp::Deposit(1_000))
                    .unwrap();
                if from.holds_reservation() {
                    balance = balance.apply(LedgerOp::Reserve(amount)).unwrap();
                }
                if let Some(op) = effects.ledger {
                    balance = balance.apply(op).unwrap();
                }
                assert!(balance.is_balanced());
                let expected_reserved = if to.holds_reservation() { amount } else { 0 };
                assert_eq!(balance.reserved_budget, expected_reserved, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn completion_walk_settles_once() {
        let effects = walk_effects(InReview, &[Paid, Completed], 50).unwrap();
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0].ledger, Some(LedgerOp::Settle(50)));
        assert_eq!(effects[0].stamp, Some(BountyStamp::PaidAt));
        assert_eq!(effects[1].ledger, None);
        assert_eq!(effects[1].stamp, Some(BountyStamp::CompletedAt));
    }

    #[test]
    fn unassign_walk_from_review_releases_once() {
        let effects = walk_effects(InReview, &[Assigned, Open], 50).unwrap();
        assert_eq!(effects[0], TransitionEffects::default());
        assert_eq!(effects[1].ledger, Some(LedgerOp::Release(50)));
        assert!(effects[1].clears_assignee);
    }

    #[test]
    fn walk_stops_at_invalid_edge() {
        let err = walk_effects(Open, &[Assigned, Paid], 50).unwrap_err();
        assert_eq!(
            err,
            AppError::InvalidTransition {
                from: "ASSIGNED".to_string(),
                to: "PAID".to_string()
            }
        );
    }
}
