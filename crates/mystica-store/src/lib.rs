//! Storage layer for the Mystica economy.
//!
//! This crate persists currency balances, the append-only ledger transaction
//! log, reward operation records, material stacks, item rows and progression.
//!
//! # Atomicity
//!
//! Every method that mutates state performs its read-check-write sequence
//! under the store's write lock and publishes the result in one step. A debit
//! either lands together with its transaction row or not at all, and a reward
//! operation's credits, materials, items, experience and operation record are
//! committed as one unit.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, used in tests and single-node setups.
//! - `RocksStore` (feature `rocksdb-backend`): column families written with a
//!   single `WriteBatch` per mutation.
//!
//! # Example
//!
//! ```
//! use mystica_core::{CurrencyKind, EntryKind, LedgerEntry, Metadata, SourceKind, UserId};
//! use mystica_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//!
//! let tx = store
//!     .apply_entry(LedgerEntry {
//!         user_id,
//!         currency_kind: CurrencyKind::Gems,
//!         delta: 25,
//!         kind: EntryKind::Source(SourceKind::DailyQuest),
//!         source_id: None,
//!         metadata: Metadata::new(),
//!     })
//!     .unwrap();
//!
//! assert_eq!(tx.new_balance, 25);
//! assert_eq!(store.get_balance(&user_id, CurrencyKind::Gems).unwrap(), 25);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;
pub mod writes;

use std::collections::BTreeMap;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;
pub use writes::RewardWrites;

use mystica_core::{
    CurrencyKind, InventoryItem, LedgerEntry, LedgerTransaction, MaterialId, OperationId,
    RewardOperation, StyleId, TransactionId, TransactionIdGenerator, UserId,
};

/// Result of committing a reward operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The staged writes were committed by this call.
    Applied(RewardOperation),
    /// The operation id had already been committed; the staged writes were
    /// discarded and the original record is returned.
    AlreadyApplied(RewardOperation),
}

impl CommitOutcome {
    /// The operation record, whichever way the commit went.
    #[must_use]
    pub fn operation(&self) -> &RewardOperation {
        match self {
            Self::Applied(op) | Self::AlreadyApplied(op) => op,
        }
    }
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (`RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Get a balance. Returns 0 when the user has no row for `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balance(&self, user_id: &UserId, currency: CurrencyKind) -> Result<i64>;

    /// Get every currency balance, each defaulting to 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balances(&self, user_id: &UserId) -> Result<BTreeMap<CurrencyKind, i64>> {
        CurrencyKind::ALL
            .into_iter()
            .map(|currency| Ok((currency, self.get_balance(user_id, currency)?)))
            .collect()
    }

    /// Apply a balance change and append its transaction row atomically.
    ///
    /// The balance row is created on first use.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientFunds` if the new balance would be negative.
    /// - `StoreError::Overflow` if the new balance would overflow.
    ///
    /// Nothing is written in either case.
    fn apply_entry(&self, entry: LedgerEntry) -> Result<LedgerTransaction>;

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId)
        -> Result<Option<LedgerTransaction>>;

    /// List a user's transactions, oldest first, optionally for one currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        user_id: &UserId,
        currency: Option<CurrencyKind>,
    ) -> Result<Vec<LedgerTransaction>>;

    // =========================================================================
    // Reward Operations
    // =========================================================================

    /// Get the record of an applied reward operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_reward_operation(&self, operation_id: &OperationId)
        -> Result<Option<RewardOperation>>;

    /// Commit staged reward writes as one unit.
    ///
    /// The operation-record check happens inside the same locked section as
    /// the writes, so concurrent commits of one operation id apply once.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit cannot be resolved or written; nothing is
    /// written in that case.
    fn commit_reward(&self, writes: RewardWrites) -> Result<CommitOutcome>;

    // =========================================================================
    // Inventory and Progression
    // =========================================================================

    /// Get the quantity of one material stack (0 if absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_material_quantity(
        &self,
        user_id: &UserId,
        material_id: &MaterialId,
        style_id: &StyleId,
    ) -> Result<i64>;

    /// List a user's items.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_items(&self, user_id: &UserId) -> Result<Vec<InventoryItem>>;

    /// Get a user's accumulated experience (0 if absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_experience(&self, user_id: &UserId) -> Result<u64>;
}

/// Reject a change that would take the balance below zero.
pub(crate) fn check_non_negative(entry: &LedgerEntry, previous_balance: i64) -> Result<()> {
    let required = entry.delta.saturating_neg();
    if entry.delta < 0 && previous_balance < required {
        return Err(StoreError::InsufficientFunds {
            currency: entry.currency_kind,
            required,
            available: previous_balance,
        });
    }
    Ok(())
}

/// Mint the next transaction id. Callers hold the write lock.
pub(crate) fn next_transaction_id(ids: &mut TransactionIdGenerator) -> Result<TransactionId> {
    ids.next_id().map_err(|err| StoreError::Database(err.to_string()))
}
