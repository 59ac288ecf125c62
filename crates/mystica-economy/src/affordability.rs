//! Read-only affordability checks.

use serde::Serialize;

use mystica_core::{CurrencyKind, Result, UserId};

use crate::ledger::Ledger;

/// Whether a user can pay an amount, and by how much they fall short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AffordabilityCheck {
    /// `current_balance >= required_amount`.
    pub can_afford: bool,
    /// Balance at the time of the check.
    pub current_balance: i64,
    /// Amount asked about.
    pub required_amount: i64,
    /// `max(0, required_amount - current_balance)`.
    pub shortfall: i64,
}

/// Balance comparisons for callers that want to show a shortfall before
/// attempting a debit.
///
/// These checks are advisory: the debit itself re-checks atomically.
#[derive(Clone)]
pub struct AffordabilityChecker {
    ledger: Ledger,
}

impl AffordabilityChecker {
    /// Create a checker reading through `ledger`.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Whether the balance covers `amount`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the store fails.
    pub fn validate_sufficient_funds(
        &self,
        user_id: &UserId,
        currency: CurrencyKind,
        amount: i64,
    ) -> Result<bool> {
        Ok(self.ledger.get_balance(user_id, currency)? >= amount)
    }

    /// Full comparison including the shortfall.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the store fails.
    pub fn get_affordability_check(
        &self,
        user_id: &UserId,
        currency: CurrencyKind,
        amount: i64,
    ) -> Result<AffordabilityCheck> {
        let current_balance = self.ledger.get_balance(user_id, currency)?;
        Ok(AffordabilityCheck {
            can_afford: current_balance >= amount,
            current_balance,
            required_amount: amount,
            shortfall: amount.saturating_sub(current_balance).max(0),
        })
    }
}
