//! Resolves the semantic role of a stored transaction.
//!
//! The store mixes two sign conventions: older expenses were written as
//! negative amounts, newer ones as positive amounts in a non-`other`
//! category. Revenue is always a positive amount in `other`.

use crate::schema::{Category, Transaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Revenue,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedEntry<'a> {
    pub transaction: &'a Transaction,
    pub role: Role,
    /// Always `>= 0`.
    pub magnitude: f64,
}

/// Returns `None` for a zero amount in `other`, which is neither revenue
/// nor expense.
pub fn classify_role(amount: f64, category: Category) -> Option<Role> {
    if category == Category::Other && amount > 0.0 {
        Some(Role::Revenue)
    } else if amount < 0.0 || category != Category::Other {
        Some(Role::Expense)
    } else {
        None
    }
}

pub fn classify(transaction: &Transaction) -> Option<ClassifiedEntry<'_>> {
    classify_role(transaction.amount, transaction.category).map(|role| ClassifiedEntry {
        transaction,
        role,
        magnitude: transaction.amount.abs(),
    })
}

pub fn classify_all(transactions: &[Transaction]) -> Vec<ClassifiedEntry<'_>> {
    transactions.iter().filter_map(classify).collect()
}
