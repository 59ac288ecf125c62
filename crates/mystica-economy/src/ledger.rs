//! Currency ledger.
//!
//! [`Ledger`] validates credit and debit requests and hands them to the store's
//! atomic `apply_entry` primitive. The balance check for a debit happens inside
//! that primitive, under the store's write lock, never as a separate read.

use std::collections::BTreeMap;
use std::sync::Arc;

use mystica_core::{
    BalanceChange, CurrencyKind, EconomyError, EntryKind, EntryOptions, LedgerEntry,
    LedgerTransaction, Result, SinkKind, SourceKind, UserId,
};
use mystica_store::Store;

/// Per-user currency balances and their transaction log.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    /// Create a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Add `amount` to a balance.
    ///
    /// The balance row is created on the first credit.
    ///
    /// # Errors
    ///
    /// - `EconomyError::Validation` if `amount` is not positive.
    /// - `EconomyError::Persistence` if the store fails.
    pub fn credit(
        &self,
        user_id: &UserId,
        currency: CurrencyKind,
        amount: i64,
        source: SourceKind,
        options: EntryOptions,
    ) -> Result<BalanceChange> {
        ensure_positive(amount, currency)?;

        let tx = self.store.apply_entry(LedgerEntry {
            user_id: *user_id,
            currency_kind: currency,
            delta: amount,
            kind: EntryKind::Source(source),
            source_id: options.source_id,
            metadata: options.metadata,
        })?;

        tracing::info!(
            user_id = %user_id,
            currency = %currency,
            amount,
            source = source.as_str(),
            new_balance = tx.new_balance,
            transaction_id = %tx.transaction_id,
            "Currency credited"
        );

        Ok(BalanceChange::from(&tx))
    }

    /// Remove `amount` from a balance, recorded as a negative delta.
    ///
    /// # Errors
    ///
    /// - `EconomyError::Validation` if `amount` is not positive.
    /// - `EconomyError::InsufficientFunds` if the balance is below `amount`;
    ///   the balance is unchanged.
    /// - `EconomyError::Persistence` if the store fails.
    pub fn debit(
        &self,
        user_id: &UserId,
        currency: CurrencyKind,
        amount: i64,
        sink: SinkKind,
        options: EntryOptions,
    ) -> Result<BalanceChange> {
        ensure_positive(amount, currency)?;

        let result = self.store.apply_entry(LedgerEntry {
            user_id: *user_id,
            currency_kind: currency,
            delta: -amount,
            kind: EntryKind::Sink(sink),
            source_id: options.source_id,
            metadata: options.metadata,
        });

        let tx = match result {
            Ok(tx) => tx,
            Err(e) => {
                let err = EconomyError::from(e);
                if let EconomyError::InsufficientFunds {
                    available,
                    shortfall,
                    ..
                } = &err
                {
                    tracing::info!(
                        user_id = %user_id,
                        currency = %currency,
                        amount,
                        available,
                        shortfall,
                        sink = sink.as_str(),
                        "Debit rejected: insufficient funds"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(
            user_id = %user_id,
            currency = %currency,
            amount,
            sink = sink.as_str(),
            new_balance = tx.new_balance,
            transaction_id = %tx.transaction_id,
            "Currency debited"
        );

        Ok(BalanceChange::from(&tx))
    }

    /// Get one balance, 0 if the user never held `currency`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the store fails.
    pub fn get_balance(&self, user_id: &UserId, currency: CurrencyKind) -> Result<i64> {
        Ok(self.store.get_balance(user_id, currency)?)
    }

    /// Get every currency balance, each defaulting to 0. Creates nothing.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the store fails.
    pub fn get_all_balances(&self, user_id: &UserId) -> Result<BTreeMap<CurrencyKind, i64>> {
        Ok(self.store.get_balances(user_id)?)
    }

    /// The audit trail for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the store fails.
    pub fn list_transactions(
        &self,
        user_id: &UserId,
        currency: Option<CurrencyKind>,
    ) -> Result<Vec<LedgerTransaction>> {
        Ok(self.store.list_transactions(user_id, currency)?)
    }
}

fn ensure_positive(amount: i64, currency: CurrencyKind) -> Result<()> {
    if amount <= 0 {
        return Err(EconomyError::validation(format!(
            "{currency} amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mystica_store::MemoryStore;

    fn ledger() -> Ledger {
        Ledger::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn credit_to_new_user_starts_from_zero() {
        let ledger = ledger();
        let user_id = UserId::generate();

        let change = ledger
            .credit(
                &user_id,
                CurrencyKind::Gems,
                25,
                SourceKind::DailyQuest,
                EntryOptions::default(),
            )
            .unwrap();

        assert_eq!(change.previous_balance, 0);
        assert_eq!(change.new_balance, 25);
        assert_eq!(ledger.get_balance(&user_id, CurrencyKind::Gems).unwrap(), 25);

        let rows = ledger.list_transactions(&user_id, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].delta, 25);
        assert_eq!(rows[0].transaction_id, change.transaction_id);
        assert_eq!(
            rows[0].source_or_sink_kind,
            EntryKind::Source(SourceKind::DailyQuest)
        );
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let ledger = ledger();
        let user_id = UserId::generate();

        for amount in [0, -10] {
            let credit = ledger.credit(
                &user_id,
                CurrencyKind::Gold,
                amount,
                SourceKind::Admin,
                EntryOptions::default(),
            );
            assert!(matches!(credit, Err(EconomyError::Validation { .. })));

            let debit = ledger.debit(
                &user_id,
                CurrencyKind::Gold,
                amount,
                SinkKind::ShopPurchase,
                EntryOptions::default(),
            );
            assert!(matches!(debit, Err(EconomyError::Validation { .. })));
        }
        assert!(ledger.list_transactions(&user_id, None).unwrap().is_empty());
    }

    #[test]
    fn overdraft_reports_shortfall_and_keeps_balance() {
        let ledger = ledger();
        let user_id = UserId::generate();
        ledger
            .credit(
                &user_id,
                CurrencyKind::Gold,
                100,
                SourceKind::CombatVictory,
                EntryOptions::default(),
            )
            .unwrap();

        let err = ledger
            .debit(
                &user_id,
                CurrencyKind::Gold,
                150,
                SinkKind::ShopPurchase,
                EntryOptions::default(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            EconomyError::InsufficientFunds {
                currency: CurrencyKind::Gold,
                required: 150,
                available: 100,
                shortfall: 50,
            }
        ));
        assert_eq!(ledger.get_balance(&user_id, CurrencyKind::Gold).unwrap(), 100);
    }

    #[test]
    fn debit_records_negative_delta_with_options() {
        let ledger = ledger();
        let user_id = UserId::generate();
        ledger
            .credit(
                &user_id,
                CurrencyKind::Gold,
                500,
                SourceKind::Iap,
                EntryOptions::default(),
            )
            .unwrap();

        let options = EntryOptions::default()
            .with_source_id("item-42")
            .with_metadata("from_level", serde_json::json!(3));
        let change = ledger
            .debit(
                &user_id,
                CurrencyKind::Gold,
                120,
                SinkKind::ItemUpgrade,
                options,
            )
            .unwrap();

        assert_eq!(change.previous_balance, 500);
        assert_eq!(change.new_balance, 380);

        let rows = ledger
            .list_transactions(&user_id, Some(CurrencyKind::Gold))
            .unwrap();
        let debit = rows.last().unwrap();
        assert_eq!(debit.delta, -120);
        assert_eq!(debit.source_id.as_deref(), Some("item-42"));
        assert_eq!(debit.metadata["from_level"], 3);
    }

    #[test]
    fn new_user_balances_are_zero_without_rows() {
        let ledger = ledger();
        let user_id = UserId::generate();

        let balances = ledger.get_all_balances(&user_id).unwrap();
        assert_eq!(
            balances,
            BTreeMap::from([(CurrencyKind::Gold, 0), (CurrencyKind::Gems, 0)])
        );
        assert!(ledger.list_transactions(&user_id, None).unwrap().is_empty());
    }

    #[test]
    fn deltas_sum_to_balance() {
        let ledger = ledger();
        let user_id = UserId::generate();
        let opts = EntryOptions::default;

        ledger
            .credit(&user_id, CurrencyKind::Gold, 300, SourceKind::Admin, opts())
            .unwrap();
        ledger
            .debit(&user_id, CurrencyKind::Gold, 75, SinkKind::ShopPurchase, opts())
            .unwrap();
        let _ = ledger.debit(&user_id, CurrencyKind::Gold, 1_000, SinkKind::ShopPurchase, opts());
        ledger
            .credit(&user_id, CurrencyKind::Gold, 20, SourceKind::Achievement, opts())
            .unwrap();

        let rows = ledger
            .list_transactions(&user_id, Some(CurrencyKind::Gold))
            .unwrap();
        assert_eq!(rows.len(), 3);
        let sum: i64 = rows.iter().map(|tx| tx.delta).sum();
        assert_eq!(sum, ledger.get_balance(&user_id, CurrencyKind::Gold).unwrap());
        assert_eq!(sum, 245);
    }

    #[test]
    fn parallel_debits_succeed_exactly_floor_b_over_a_times() {
        const START: i64 = 1_000;
        const AMOUNT: i64 = 70;
        const ATTEMPTS: usize = 32;

        let ledger = ledger();
        let user_id = UserId::generate();
        ledger
            .credit(
                &user_id,
                CurrencyKind::Gold,
                START,
                SourceKind::Admin,
                EntryOptions::default(),
            )
            .unwrap();

        let successes = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..ATTEMPTS)
                .map(|_| {
                    let ledger = ledger.clone();
                    scope.spawn(move || {
                        ledger
                            .debit(
                                &user_id,
                                CurrencyKind::Gold,
                                AMOUNT,
                                SinkKind::ShopPurchase,
                                EntryOptions::default(),
                            )
                            .is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        let expected = usize::try_from(START / AMOUNT).unwrap();
        assert_eq!(successes, expected);
        assert_eq!(
            ledger.get_balance(&user_id, CurrencyKind::Gold).unwrap(),
            START % AMOUNT
        );
    }
}
