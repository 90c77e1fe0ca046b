//! Stock side effects of transactions
//!
//! A live sale holds units out of stock and a live purchase holds units in
//! stock at its unit cost. "Live" means any status other than refused, so a
//! pending sale already reserves its units. Editing, re-statusing or
//! deleting a transaction is expressed as reverting the old effect and then
//! applying the new one.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Transaction, TransactionStatus, TransactionType};

/// Decimal places kept on a recomputed buy price
pub const COST_SCALE: u32 = 4;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("insufficient stock for item {item_id}: {available} available, {requested} requested")]
    InsufficientStock {
        item_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("inventory item {0} does not exist")]
    UnknownItem(Uuid),

    #[error("stock or cost of item {0} is out of range")]
    OutOfRange(Uuid),
}

/// The parts of a transaction that matter for stock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry {
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub item_id: Option<Uuid>,
    pub quantity: i32,
    pub amount: Decimal,
}

impl From<&Transaction> for LedgerEntry {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_type: tx.transaction_type,
            status: tx.status,
            item_id: tx.item_id,
            quantity: tx.quantity,
            amount: tx.amount,
        }
    }
}

/// What a live transaction does to one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockEffect {
    Remove { item_id: Uuid, quantity: i32 },
    Add { item_id: Uuid, quantity: i32, unit_cost: Decimal },
}

impl StockEffect {
    pub fn item_id(&self) -> Uuid {
        match self {
            StockEffect::Remove { item_id, .. } | StockEffect::Add { item_id, .. } => *item_id,
        }
    }
}

/// One step of a plan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", content = "effect", rename_all = "snake_case")]
pub enum Step {
    Revert(StockEffect),
    Apply(StockEffect),
}

impl Step {
    pub fn item_id(&self) -> Uuid {
        match self {
            Step::Revert(effect) | Step::Apply(effect) => effect.item_id(),
        }
    }
}

/// Effect of an entry while it is live; `None` when it does not touch stock
pub fn stock_effect(entry: &LedgerEntry) -> Option<StockEffect> {
    if entry.status == TransactionStatus::Refused || entry.quantity <= 0 {
        return None;
    }
    let item_id = entry.item_id?;
    match entry.transaction_type {
        TransactionType::Sale => Some(StockEffect::Remove {
            item_id,
            quantity: entry.quantity,
        }),
        TransactionType::Purchase => Some(StockEffect::Add {
            item_id,
            quantity: entry.quantity,
            unit_cost: entry.amount / Decimal::from(entry.quantity),
        }),
        TransactionType::Expense => None,
    }
}

/// Steps that move stock from the `old` state of a transaction to the `new`
/// one. `old = None` is a create, `new = None` a delete.
pub fn plan(old: Option<&LedgerEntry>, new: Option<&LedgerEntry>) -> Vec<Step> {
    let before = old.and_then(stock_effect);
    let after = new.and_then(stock_effect);
    if before == after {
        return Vec::new();
    }
    before
        .map(Step::Revert)
        .into_iter()
        .chain(after.map(Step::Apply))
        .collect()
}

/// Quantity and cost of one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i32,
    pub buy_price: Decimal,
}

impl StockLevel {
    pub fn new(quantity: i32, buy_price: Decimal) -> Self {
        Self {
            quantity,
            buy_price,
        }
    }

    pub fn apply(&mut self, effect: &StockEffect) -> Result<(), LedgerError> {
        match *effect {
            StockEffect::Remove { item_id, quantity } => self.take(item_id, quantity),
            StockEffect::Add {
                item_id,
                quantity,
                unit_cost,
            } => {
                let total = self
                    .quantity
                    .checked_add(quantity)
                    .ok_or(LedgerError::OutOfRange(item_id))?;
                self.buy_price =
                    weighted_average_cost(self.quantity, self.buy_price, quantity, unit_cost)
                        .ok_or(LedgerError::OutOfRange(item_id))?;
                self.quantity = total;
                Ok(())
            }
        }
    }

    pub fn revert(&mut self, effect: &StockEffect) -> Result<(), LedgerError> {
        match *effect {
            StockEffect::Remove { item_id, quantity } => {
                self.quantity = self
                    .quantity
                    .checked_add(quantity)
                    .ok_or(LedgerError::OutOfRange(item_id))?;
                Ok(())
            }
            StockEffect::Add {
                item_id,
                quantity,
                unit_cost,
            } => {
                let price = unwind_average_cost(self.quantity, self.buy_price, quantity, unit_cost)
                    .ok_or(LedgerError::OutOfRange(item_id))?;
                self.take(item_id, quantity)?;
                if self.quantity > 0 {
                    self.buy_price = price;
                }
                Ok(())
            }
        }
    }

    fn take(&mut self, item_id: Uuid, quantity: i32) -> Result<(), LedgerError> {
        if self.quantity < quantity {
            return Err(LedgerError::InsufficientStock {
                item_id,
                available: self.quantity,
                requested: quantity,
            });
        }
        self.quantity -= quantity;
        Ok(())
    }
}

/// Run a plan against a set of levels. Nothing is modified unless every
/// step succeeds. Reverting an effect on an item that no longer exists is a
/// no-op; applying one is an error.
pub fn execute(plan: &[Step], levels: &mut HashMap<Uuid, StockLevel>) -> Result<(), LedgerError> {
    let mut working = levels.clone();
    for step in plan {
        match step {
            Step::Revert(effect) => {
                if let Some(level) = working.get_mut(&effect.item_id()) {
                    level.revert(effect)?;
                }
            }
            Step::Apply(effect) => {
                let level = working
                    .get_mut(&effect.item_id())
                    .ok_or(LedgerError::UnknownItem(effect.item_id()))?;
                level.apply(effect)?;
            }
        }
    }
    *levels = working;
    Ok(())
}

/// Buy price after adding `incoming_qty` units at `incoming_cost`.
/// `None` when the values do not fit a `Decimal`.
pub fn weighted_average_cost(
    current_qty: i32,
    current_cost: Decimal,
    incoming_qty: i32,
    incoming_cost: Decimal,
) -> Option<Decimal> {
    let total_qty = i64::from(current_qty) + i64::from(incoming_qty);
    if total_qty <= 0 {
        return Some(incoming_cost.round_dp(COST_SCALE));
    }
    let current_value = Decimal::from(current_qty.max(0)).checked_mul(current_cost)?;
    let incoming_value = Decimal::from(incoming_qty).checked_mul(incoming_cost)?;
    let total_value = current_value.checked_add(incoming_value)?;
    Some(total_value.checked_div(Decimal::from(total_qty))?.round_dp(COST_SCALE))
}

/// Buy price after taking back `removed_qty` units that came in at
/// `removed_cost`. Keeps the current price when nothing would remain.
pub fn unwind_average_cost(
    current_qty: i32,
    current_cost: Decimal,
    removed_qty: i32,
    removed_cost: Decimal,
) -> Option<Decimal> {
    let remaining = i64::from(current_qty) - i64::from(removed_qty);
    if remaining <= 0 {
        return Some(current_cost);
    }
    let value = Decimal::from(current_qty)
        .checked_mul(current_cost)?
        .checked_sub(Decimal::from(removed_qty).checked_mul(removed_cost)?)?;
    Some(
        value
            .checked_div(Decimal::from(remaining))?
            .max(Decimal::ZERO)
            .round_dp(COST_SCALE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(kind: TransactionType, status: TransactionStatus, item: Uuid, qty: i32, amount: i64) -> LedgerEntry {
        LedgerEntry {
            transaction_type: kind,
            status,
            item_id: Some(item),
            quantity: qty,
            amount: Decimal::from(amount),
        }
    }

    #[test]
    fn test_refused_has_no_effect() {
        let e = entry(TransactionType::Sale, TransactionStatus::Refused, Uuid::new_v4(), 2, 100);
        assert_eq!(stock_effect(&e), None);
    }

    #[test]
    fn test_pending_sale_reserves_stock() {
        let item = Uuid::new_v4();
        let e = entry(TransactionType::Sale, TransactionStatus::Pending, item, 2, 100);
        assert_eq!(
            stock_effect(&e),
            Some(StockEffect::Remove { item_id: item, quantity: 2 })
        );
    }

    #[test]
    fn test_expense_and_itemless_lines_have_no_effect() {
        let mut e = entry(TransactionType::Expense, TransactionStatus::Completed, Uuid::new_v4(), 1, 80);
        assert_eq!(stock_effect(&e), None);
        e.transaction_type = TransactionType::Purchase;
        e.item_id = None;
        assert_eq!(stock_effect(&e), None);
    }

    #[test]
    fn test_purchase_unit_cost() {
        let item = Uuid::new_v4();
        let e = entry(TransactionType::Purchase, TransactionStatus::Completed, item, 4, 100);
        assert_eq!(
            stock_effect(&e),
            Some(StockEffect::Add { item_id: item, quantity: 4, unit_cost: Decimal::from(25) })
        );
    }

    #[test]
    fn test_wac() {
        // 10 @ 20 + 5 @ 26 = 330 / 15 = 22
        assert_eq!(weighted_average_cost(10, Decimal::from(20), 5, Decimal::from(26)), Some(Decimal::from(22)));
        // empty stock takes the incoming cost
        assert_eq!(weighted_average_cost(0, Decimal::from(99), 3, Decimal::from(7)), Some(Decimal::from(7)));
    }

    #[test]
    fn test_unwind_restores_previous_cost() {
        let wac = weighted_average_cost(10, Decimal::from(20), 5, Decimal::from(26)).unwrap();
        assert_eq!(unwind_average_cost(15, wac, 5, Decimal::from(26)), Some(Decimal::from(20)));
        assert_eq!(unwind_average_cost(5, Decimal::from(26), 5, Decimal::from(26)), Some(Decimal::from(26)));
    }

    #[test]
    fn test_sale_beyond_stock_fails() {
        let item = Uuid::new_v4();
        let mut level = StockLevel::new(1, Decimal::from(10));
        let err = level
            .apply(&StockEffect::Remove { item_id: item, quantity: 2 })
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock { item_id: item, available: 1, requested: 2 }
        );
        assert_eq!(level.quantity, 1);
    }

    #[test]
    fn test_plan_for_status_toggle() {
        let item = Uuid::new_v4();
        let pending = entry(TransactionType::Sale, TransactionStatus::Pending, item, 3, 150);
        let completed = LedgerEntry { status: TransactionStatus::Completed, ..pending };
        let refused = LedgerEntry { status: TransactionStatus::Refused, ..pending };

        // pending -> completed keeps the reservation
        assert!(plan(Some(&pending), Some(&completed)).is_empty());
        // completed -> refused gives the units back
        assert_eq!(
            plan(Some(&completed), Some(&refused)),
            vec![Step::Revert(StockEffect::Remove { item_id: item, quantity: 3 })]
        );
        // refused -> pending takes them again
        assert_eq!(
            plan(Some(&refused), Some(&pending)),
            vec![Step::Apply(StockEffect::Remove { item_id: item, quantity: 3 })]
        );
    }

    #[test]
    fn test_plan_for_item_swap() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let old = entry(TransactionType::Sale, TransactionStatus::Completed, a, 1, 50);
        let new = LedgerEntry { item_id: Some(b), ..old };
        let steps = plan(Some(&old), Some(&new));
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].item_id(), a);
        assert_eq!(steps[1].item_id(), b);
    }

    #[test]
    fn test_execute_is_all_or_nothing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut levels = HashMap::from([
            (a, StockLevel::new(0, Decimal::from(10))),
            (b, StockLevel::new(1, Decimal::from(10))),
        ]);
        let old = entry(TransactionType::Sale, TransactionStatus::Completed, a, 2, 40);
        let new = LedgerEntry { item_id: Some(b), ..old };

        let result = execute(&plan(Some(&old), Some(&new)), &mut levels);
        assert!(matches!(result, Err(LedgerError::InsufficientStock { .. })));
        assert_eq!(levels[&a].quantity, 0);
        assert_eq!(levels[&b].quantity, 1);
    }

    #[test]
    fn test_execute_skips_reverting_deleted_item() {
        let gone = Uuid::new_v4();
        let old = entry(TransactionType::Sale, TransactionStatus::Completed, gone, 2, 40);
        let mut levels = HashMap::new();
        assert!(execute(&plan(Some(&old), None), &mut levels).is_ok());
    }

    #[test]
    fn test_execute_requires_item_to_apply() {
        let gone = Uuid::new_v4();
        let new = entry(TransactionType::Purchase, TransactionStatus::Completed, gone, 2, 40);
        let mut levels = HashMap::new();
        assert_eq!(
            execute(&plan(None, Some(&new)), &mut levels),
            Err(LedgerError::UnknownItem(gone))
        );
    }

    #[test]
    fn test_reverting_consumed_purchase_fails() {
        let item = Uuid::new_v4();
        let mut level = StockLevel::new(2, Decimal::from(10));
        let effect = StockEffect::Add { item_id: item, quantity: 5, unit_cost: Decimal::from(10) };
        assert!(level.revert(&effect).is_err());
        assert_eq!(level, StockLevel::new(2, Decimal::from(10)));
    }

    #[test]
    fn test_purchase_past_stock_limit_is_rejected() {
        let item = Uuid::new_v4();
        let mut levels = HashMap::from([(item, StockLevel::new(10, Decimal::from(20)))]);
        let huge = LedgerEntry {
            transaction_type: TransactionType::Purchase,
            status: TransactionStatus::Completed,
            item_id: Some(item),
            quantity: i32::MAX,
            amount: Decimal::from(i32::MAX),
        };
        assert_eq!(
            execute(&plan(None, Some(&huge)), &mut levels),
            Err(LedgerError::OutOfRange(item))
        );
        assert_eq!(levels[&item], StockLevel::new(10, Decimal::from(20)));
    }

    #[test]
    fn test_refusing_sale_past_stock_limit_is_rejected() {
        let item = Uuid::new_v4();
        let mut level = StockLevel::new(i32::MAX - 1, Decimal::ONE);
        let effect = StockEffect::Remove { item_id: item, quantity: 5 };
        assert_eq!(level.revert(&effect), Err(LedgerError::OutOfRange(item)));
        assert_eq!(level.quantity, i32::MAX - 1);
    }

    #[test]
    fn test_cost_overflow_is_none() {
        assert_eq!(weighted_average_cost(2, Decimal::MAX, 1, Decimal::ONE), None);
        assert_eq!(unwind_average_cost(3, Decimal::MAX, 1, Decimal::ONE), None);
        assert!(weighted_average_cost(i32::MAX, Decimal::ONE, i32::MAX, Decimal::ONE).is_some());
    }

    fn money() -> impl Strategy<Value = Decimal> {
        prop_oneof![
            (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2)),
            Just(Decimal::MAX),
        ]
    }

    proptest! {
        /// Any stock level and any effect either apply cleanly or fail with
        /// an error; a failure leaves the level as it was
        #[test]
        fn test_apply_never_panics(
            quantity in 0i32..=i32::MAX,
            price in money(),
            moved in 1i32..=i32::MAX,
            unit_cost in money(),
            add in any::<bool>(),
            forward in any::<bool>(),
        ) {
            let item = Uuid::new_v4();
            let effect = if add {
                StockEffect::Add { item_id: item, quantity: moved, unit_cost }
            } else {
                StockEffect::Remove { item_id: item, quantity: moved }
            };
            let before = StockLevel::new(quantity, price);
            let mut level = before;
            let result = if forward { level.apply(&effect) } else { level.revert(&effect) };
            if result.is_err() {
                prop_assert_eq!(level, before);
            }
            prop_assert!(level.quantity >= 0);
        }
    }
}
