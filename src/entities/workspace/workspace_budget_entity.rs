use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::method::Query;
use surrealdb::sql::Thing;
use tracing::info;

use crate::database::client::Db;
use crate::entities::workspace::workspace_entity;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, AppResult, CtxResult};
use crate::middleware::utils::db_utils::{
    check_transaction_custom_error, get_entity, map_query_error, with_not_found_err, IdentIdName,
    THROW_INSUFFICIENT_BUDGET, THROW_PREFIX_INVALID_STATE, THROW_PREFIX_NOT_FOUND,
};

pub const TABLE_NAME: &str = "workspace_budget";
const WORKSPACE_TABLE: &str = workspace_entity::TABLE_NAME;

/// Upper bound for any single amount, 21M BTC in sats.
pub const MAX_AMOUNT_SATS: u64 = 2_100_000_000_000_000;

/// The four movements the ledger knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOp {
    Deposit(u64),
    Reserve(u64),
    Release(u64),
    Settle(u64),
}

impl LedgerOp {
    pub fn amount(&self) -> u64 {
        match *self {
            LedgerOp::Deposit(a)
            | LedgerOp::Reserve(a)
            | LedgerOp::Release(a)
            | LedgerOp::Settle(a) => a,
        }
    }

    /// Incremental adjustment for a bounty whose reserved amount moves from `old` to `new`.
    pub fn for_amount_change(old: u64, new: u64) -> Option<LedgerOp> {
        match new.cmp(&old) {
            std::cmp::Ordering::Greater => Some(LedgerOp::Reserve(new - old)),
            std::cmp::Ordering::Less => Some(LedgerOp::Release(old - new)),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Budget figures of a workspace.
/// Always `total == available + reserved + paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetBalance {
    pub total_budget: u64,
    pub available_budget: u64,
    pub reserved_budget: u64,
    pub paid_budget: u64,
}

impl BudgetBalance {
    pub fn is_balanced(&self) -> bool {
        self.available_budget
            .checked_add(self.reserved_budget)
            .and_then(|v| v.checked_add(self.paid_budget))
            == Some(self.total_budget)
    }

    pub fn apply(&self, op: LedgerOp) -> AppResult<BudgetBalance> {
        let amount = op.amount();
        if amount == 0 {
            return Err(AppError::Validation {
                description: "Amount must be a positive integer".to_string(),
            });
        }
        let overflow = || AppError::Validation {
            description: "Budget overflow".to_string(),
        };
        let underflow = || AppError::InvalidState {
            description: "Reserved budget would underflow".to_string(),
        };

        let mut next = *self;
        match op {
            LedgerOp::Deposit(_) => {
                next.available_budget = self.available_budget.checked_add(amount).ok_or_else(overflow)?;
                next.total_budget = self
                    .total_budget
                    .checked_add(amount)
                    .filter(|total| *total <= MAX_AMOUNT_SATS)
                    .ok_or_else(overflow)?;
            }
            LedgerOp::Reserve(_) => {
                next.available_budget = self
                    .available_budget
                    .checked_sub(amount)
                    .ok_or(AppError::InsufficientBudget)?;
                next.reserved_budget = self.reserved_budget.checked_add(amount).ok_or_else(overflow)?;
            }
            LedgerOp::Release(_) => {
                next.reserved_budget = self.reserved_budget.checked_sub(amount).ok_or_else(underflow)?;
                next.available_budget = self.available_budget.checked_add(amount).ok_or_else(overflow)?;
            }
            LedgerOp::Settle(_) => {
                next.reserved_budget = self.reserved_budget.checked_sub(amount).ok_or_else(underflow)?;
                next.paid_budget = self.paid_budget.checked_add(amount).ok_or_else(overflow)?;
            }
        }
        debug_assert!(next.is_balanced());
        Ok(next)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceBudget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub workspace: Thing,
    pub total_budget: u64,
    pub available_budget: u64,
    pub reserved_budget: u64,
    pub paid_budget: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkspaceBudget {
    pub fn balance(&self) -> BudgetBalance {
        BudgetBalance {
            total_budget: self.total_budget,
            available_budget: self.available_budget,
            reserved_budget: self.reserved_budget,
            paid_budget: self.paid_budget,
        }
    }
}

pub struct WorkspaceBudgetDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

impl<'a> WorkspaceBudgetDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS workspace ON TABLE {TABLE_NAME} TYPE record<{WORKSPACE_TABLE}> READONLY;
    DEFINE INDEX IF NOT EXISTS workspace_idx ON TABLE {TABLE_NAME} COLUMNS workspace UNIQUE;
    DEFINE FIELD IF NOT EXISTS total_budget ON TABLE {TABLE_NAME} TYPE int ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS available_budget ON TABLE {TABLE_NAME} TYPE int ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS reserved_budget ON TABLE {TABLE_NAME} TYPE int ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS paid_budget ON TABLE {TABLE_NAME} TYPE int ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS updated_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE time::now();
    ");
        let mutation = self.db.query(sql).await?;

        mutation.check().expect("should mutate workspace_budget");

        Ok(())
    }

    pub fn get_budget_id(workspace_id: &Thing) -> Thing {
        Thing::from((TABLE_NAME, workspace_id.id.clone()))
    }

    pub async fn get_by_workspace(&self, workspace_id: &Thing) -> CtxResult<WorkspaceBudget> {
        let ident = IdentIdName::Id(Self::get_budget_id(workspace_id));
        let opt = get_entity::<WorkspaceBudget>(self.db, TABLE_NAME, &ident).await?;
        with_not_found_err(opt, self.ctx, "Workspace budget")
    }

    pub fn build_create_query<'b>(
        &self,
        query: Query<'b, Any>,
        workspace_id: &Thing,
    ) -> Query<'b, Any> {
        query
            .query(
                "CREATE $_budget_id SET workspace = $_budget_workspace,
                    total_budget = 0, available_budget = 0, reserved_budget = 0, paid_budget = 0;",
            )
            .bind(("_budget_id", Self::get_budget_id(workspace_id)))
            .bind(("_budget_workspace", workspace_id.clone()))
    }

    /// Appends one ledger movement to a transaction. `key` keeps the bindings of
    /// several movements inside the same transaction apart.
    pub fn build_ledger_query<'b>(
        &self,
        query: Query<'b, Any>,
        workspace_id: &Thing,
        op: LedgerOp,
        key: &str,
    ) -> Query<'b, Any> {
        let b = format!("$_budget_{key}");
        let (guard, update) = match op {
            LedgerOp::Deposit(_) => (
                String::new(),
                format!("available_budget += {b}_amt, total_budget += {b}_amt"),
            ),
            LedgerOp::Reserve(_) => (
                format!("IF {b}.available_budget < {b}_amt {{ THROW \"{THROW_INSUFFICIENT_BUDGET}\" }};"),
                format!("available_budget -= {b}_amt, reserved_budget += {b}_amt"),
            ),
            LedgerOp::Release(_) => (
                format!("IF {b}.reserved_budget < {b}_amt {{ THROW \"{THROW_PREFIX_INVALID_STATE}Reserved budget would underflow\" }};"),
                format!("reserved_budget -= {b}_amt, available_budget += {b}_amt"),
            ),
            LedgerOp::Settle(_) => (
                format!("IF {b}.reserved_budget < {b}_amt {{ THROW \"{THROW_PREFIX_INVALID_STATE}Reserved budget would underflow\" }};"),
                format!("reserved_budget -= {b}_amt, paid_budget += {b}_amt"),
            ),
        };

        let sql = format!("
            LET {b} = (SELECT * FROM {b}_id)[0];
            IF {b} == NONE {{ THROW \"{THROW_PREFIX_NOT_FOUND}Workspace budget\" }};
            {guard}
            UPDATE {b}_id SET {update};
            LET {b}_after = (SELECT * FROM {b}_id)[0];
            IF {b}_after.total_budget != {b}_after.available_budget + {b}_after.reserved_budget + {b}_after.paid_budget {{
                THROW \"{THROW_PREFIX_INVALID_STATE}Budget conservation violated\"
            }};
        ");

        query
            .query(sql)
            .bind((format!("_budget_{key}_id"), Self::get_budget_id(workspace_id)))
            .bind((format!("_budget_{key}_amt"), op.amount() as i64))
    }

    pub async fn deposit(&self, workspace_id: &Thing, amount: u64) -> CtxResult<WorkspaceBudget> {
        let current = self.get_by_workspace(workspace_id).await?;
        current
            .balance()
            .apply(LedgerOp::Deposit(amount))
            .map_err(|e| self.ctx.to_ctx_error(e))?;

        let mut query = self.db.query("BEGIN TRANSACTION;");
        query = self.build_ledger_query(query, workspace_id, LedgerOp::Deposit(amount), "deposit");
        query = query.query("COMMIT TRANSACTION;");
        let on_conflict = AppError::Conflict {
            description: "Budget was modified concurrently".to_string(),
        };
        let mut res = query
            .await
            .map_err(|e| self.ctx.to_ctx_error(map_query_error(e, on_conflict.clone())))?;
        check_transaction_custom_error(&mut res, on_conflict)
            .map_err(|e| self.ctx.to_ctx_error(e))?;

        info!(workspace = %workspace_id, amount, "budget deposit");
        self.get_by_workspace(workspace_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(amount: u64) -> BudgetBalance {
        BudgetBalance::default().apply(LedgerOp::Deposit(amount)).unwrap()
    }

    #[test]
    fn deposit_grows_total_and_available() {
        let b = funded(100_000);
        assert_eq!(b.total_budget, 100_000);
        assert_eq!(b.available_budget, 100_000);
        assert!(b.is_balanced());
    }

    #[test]
    fn reserve_then_settle_moves_funds_to_paid() {
        let b = funded(100_000);
        let b = b.apply(LedgerOp::Reserve(50_000)).unwrap();
        assert_eq!(b.available_budget, 50_000);
        assert_eq!(b.reserved_budget, 50_000);
        let b = b.apply(LedgerOp::Settle(50_000)).unwrap();
        assert_eq!(b.reserved_budget, 0);
        assert_eq!(b.paid_budget, 50_000);
        assert_eq!(b.total_budget, 100_000);
        assert!(b.is_balanced());
    }

    #[test]
    fn reserve_exact_available_leaves_zero() {
        let b = funded(42).apply(LedgerOp::Reserve(42)).unwrap();
        assert_eq!(b.available_budget, 0);
        assert_eq!(b.reserved_budget, 42);
    }

    #[test]
    fn reserve_more_than_available_fails() {
        let b = funded(50_000);
        assert_eq!(
            b.apply(LedgerOp::Reserve(60_000)),
            Err(AppError::InsufficientBudget)
        );
    }

    #[test]
    fn release_and_settle_cannot_underflow() {
        let b = funded(10).apply(LedgerOp::Reserve(5)).unwrap();
        assert!(matches!(
            b.apply(LedgerOp::Release(6)),
            Err(AppError::InvalidState { .. })
        ));
        assert!(matches!(
            b.apply(LedgerOp::Settle(6)),
            Err(AppError::InvalidState { .. })
        ));
    }

    #[test]
    fn zero_amount_is_rejected() {
        assert!(matches!(
            BudgetBalance::default().apply(LedgerOp::Deposit(0)),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn deposit_is_capped() {
        let balance = funded(MAX_AMOUNT_SATS - 10);
        assert!(balance.apply(LedgerOp::Deposit(10)).is_ok());
        assert_eq!(
            balance.apply(LedgerOp::Deposit(11)),
            Err(AppError::Validation {
                description: "Budget overflow".to_string()
            })
        );
    }

    #[test]
    fn reserve_release_round_trip() {
        let before = funded(1_000);
        let after = before
            .apply(LedgerOp::Reserve(400))
            .and_then(|b| b.apply(LedgerOp::Release(400)))
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn amount_change_is_incremental() {
        assert_eq!(LedgerOp::for_amount_change(100, 150), Some(LedgerOp::Reserve(50)));
        assert_eq!(LedgerOp::for_amount_change(150, 100), Some(LedgerOp::Release(50)));
        assert_eq!(LedgerOp::for_amount_change(100, 100), None);
    }

    #[test]
    fn conservation_holds_over_mixed_sequence() {
        let ops = [
            LedgerOp::Deposit(1_000),
            LedgerOp::Reserve(300),
            LedgerOp::Reserve(200),
            LedgerOp::Release(100),
            LedgerOp::Settle(200),
            LedgerOp::Deposit(50),
        ];
        let mut balance = BudgetBalance::default();
        for op in ops {
            balance = balance.apply(op).unwrap();
            assert!(balance.is_balanced());
        }
        assert_eq!(
            balance,
            BudgetBalance {
                total_budget: 1_050,
                available_budget: 650,
                reserved_budget: 200,
                paid_budget: 200,
            }
        );
    }
}
