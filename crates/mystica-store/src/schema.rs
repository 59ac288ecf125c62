//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Currency balances, keyed by `user_id || currency tag`.
    pub const BALANCES: &str = "balances";

    /// Ledger transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Applied reward operations for idempotency, keyed by `operation_id`.
    pub const REWARD_OPERATIONS: &str = "reward_operations";

    /// Material stack quantities, keyed by `user_id || material_id || style_id`.
    pub const MATERIALS: &str = "materials";

    /// Item rows, keyed by `item_id`.
    pub const ITEMS: &str = "items";

    /// Index: items by user, keyed by `user_id || item_id`.
    /// Value is empty (index only).
    pub const ITEMS_BY_USER: &str = "items_by_user";

    /// Accumulated experience, keyed by `user_id`.
    pub const PROGRESSION: &str = "progression";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BALANCES,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::REWARD_OPERATIONS,
        cf::MATERIALS,
        cf::ITEMS,
        cf::ITEMS_BY_USER,
        cf::PROGRESSION,
    ]
}
