//! Core types for the Mystica economy.
//!
//! This crate provides the foundational types shared by the store, the economy
//! components and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `OperationId`, `TransactionId`, `LocationId`, ...
//! - **Currency**: `CurrencyKind`, `SourceKind`, `SinkKind`, `EntryKind`
//! - **Ledger**: `LedgerTransaction`, `LedgerEntry`, `EntryOptions`, `BalanceChange`
//! - **Rewards**: `RewardBundle`, `RewardResult`, `RewardOperation`, `InventoryItem`
//!
//! Balances are `i64` integer units; there is no fractional currency.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod currency;
pub mod error;
pub mod ids;
pub mod reward;
pub mod transaction;

pub use currency::{CurrencyKind, EntryKind, SinkKind, SourceKind};
pub use error::{EconomyError, Result};
pub use ids::{
    EnemyTypeId, IdError, ItemId, ItemTypeId, LocationId, MaterialId, OperationId, StyleId,
    TransactionId, TransactionIdGenerator, UserId,
};
pub use reward::{
    AppliedMaterial, AppliedRewards, ApplyOutcome, InventoryItem, ItemGrant, MaterialGrant,
    MaterialStack, Rarity, RewardBundle, RewardOperation, RewardResult, MATERIAL_SLOT_COUNT,
};
pub use transaction::{BalanceChange, EntryOptions, LedgerEntry, LedgerTransaction, Metadata};
