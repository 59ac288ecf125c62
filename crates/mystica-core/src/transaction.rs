//! Ledger transaction types.
//!
//! Every change to a currency balance appends one [`LedgerTransaction`].
//! Rows are never updated or deleted; summing the deltas of a (user, currency)
//! pair reproduces its balance.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyKind, EntryKind};
use crate::{TransactionId, UserId};

/// Opaque key/value context attached to a transaction.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// An immutable audit-log row for one balance mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub transaction_id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Which balance was affected.
    pub currency_kind: CurrencyKind,

    /// Signed change. Positive = credit, negative = debit.
    pub delta: i64,

    /// Balance before this transaction.
    pub previous_balance: i64,

    /// Balance after this transaction.
    pub new_balance: i64,

    /// Why the balance changed.
    pub source_or_sink_kind: EntryKind,

    /// Upstream reference (operation id, purchase receipt, item id).
    pub source_id: Option<String>,

    /// Additional context.
    #[serde(default)]
    pub metadata: Metadata,

    /// When the transaction was recorded.
    pub created_at: DateTime<Utc>,
}

/// A balance mutation that has not been applied yet.
///
/// Stores turn an entry into a [`LedgerTransaction`] once they have read the
/// current balance under their write lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// The user whose balance changes.
    pub user_id: UserId,
    /// Which balance changes.
    pub currency_kind: CurrencyKind,
    /// Signed change.
    pub delta: i64,
    /// Why the balance changes.
    pub kind: EntryKind,
    /// Upstream reference.
    pub source_id: Option<String>,
    /// Additional context.
    pub metadata: Metadata,
}

impl LedgerEntry {
    /// Materialize the audit row for this entry given the balance it applies to.
    ///
    /// The store mints `transaction_id` under its write lock so ids follow
    /// commit order. Returns `None` if the new balance would overflow.
    #[must_use]
    pub fn into_transaction(
        self,
        transaction_id: TransactionId,
        previous_balance: i64,
    ) -> Option<LedgerTransaction> {
        let new_balance = previous_balance.checked_add(self.delta)?;
        Some(LedgerTransaction {
            transaction_id,
            user_id: self.user_id,
            currency_kind: self.currency_kind,
            delta: self.delta,
            previous_balance,
            new_balance,
            source_or_sink_kind: self.kind,
            source_id: self.source_id,
            metadata: self.metadata,
            created_at: Utc::now(),
        })
    }
}

/// Optional parameters for a credit or debit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryOptions {
    /// Upstream reference. Defaults to absent.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Additional context. Defaults to an empty map.
    #[serde(default)]
    pub metadata: Metadata,
}

impl EntryOptions {
    /// Set the source id.
    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Outcome of a successful credit or debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// Balance before the change.
    pub previous_balance: i64,
    /// Balance after the change.
    pub new_balance: i64,
    /// The audit row that recorded it.
    pub transaction_id: TransactionId,
}

impl From<&LedgerTransaction> for BalanceChange {
    fn from(tx: &LedgerTransaction) -> Self {
        Self {
            previous_balance: tx.previous_balance,
            new_balance: tx.new_balance,
            transaction_id: tx.transaction_id,
        }
    }
}
