//! Economy components for Mystica.
//!
//! - [`Ledger`]: credits and debits against per-user currency balances, with
//!   an append-only transaction trail.
//! - [`AffordabilityChecker`]: read-only balance comparisons.
//! - [`RewardEngine`]: applies a reward bundle exactly once per operation id.
//! - [`LootOrchestrator`]: enemy selection, loot rolls and reward application
//!   for instant loot.
//! - [`Catalog`]: a JSON-backed implementation of the lookup, selection and
//!   loot-generation collaborators.
//!
//! Components are constructed explicitly and share a store through `Arc`.
//!
//! ```
//! use std::sync::Arc;
//!
//! use mystica_core::{CurrencyKind, EntryOptions, SinkKind, SourceKind, UserId};
//! use mystica_economy::{AffordabilityChecker, Ledger};
//! use mystica_store::MemoryStore;
//!
//! let ledger = Ledger::new(Arc::new(MemoryStore::new()));
//! let checker = AffordabilityChecker::new(ledger.clone());
//! let user_id = UserId::generate();
//!
//! ledger
//!     .credit(&user_id, CurrencyKind::Gold, 100, SourceKind::CombatVictory, EntryOptions::default())
//!     .unwrap();
//!
//! let check = checker
//!     .get_affordability_check(&user_id, CurrencyKind::Gold, 150)
//!     .unwrap();
//! assert_eq!(check.shortfall, 50);
//!
//! let err = ledger
//!     .debit(&user_id, CurrencyKind::Gold, 150, SinkKind::ShopPurchase, EntryOptions::default())
//!     .unwrap_err();
//! assert!(!err.is_retryable());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod affordability;
pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod ledger;
pub mod loot;
pub mod rewards;

pub use affordability::{AffordabilityCheck, AffordabilityChecker};
pub use catalog::{Catalog, CatalogFile, LocationEntry, LootTable};
pub use collaborators::{
    EnemySelector, ItemPersistence, Location, LocationLookup, LootGenerator, MaterialPersistence,
    SelectedEnemy, StagedPersistence,
};
pub use config::EconomyConfig;
pub use ledger::Ledger;
pub use loot::{CombatSummary, InstantLootResult, LootItem, LootOrchestrator};
pub use rewards::RewardEngine;
