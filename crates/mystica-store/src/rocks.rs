//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Mutations read under `write_lock` and publish through a single
//! `WriteBatch`, so readers never observe a balance without its transaction
//! row, or half of a reward operation. The lock also owns the transaction id
//! generator, so the by-user index iterates in commit order.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use mystica_core::{
    CurrencyKind, InventoryItem, LedgerEntry, LedgerTransaction, MaterialId, OperationId,
    RewardOperation, StyleId, TransactionId, TransactionIdGenerator, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::writes::{CommitSource, RewardWrites};
use crate::{check_non_negative, next_transaction_id, CommitOutcome, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<TransactionIdGenerator>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(TransactionIdGenerator::new()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read and decode one value.
    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect index keys under `prefix`, in key order.
    fn index_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut keys = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl CommitSource for RocksStore {
    fn balance(&self, user_id: &UserId, currency: CurrencyKind) -> Result<i64> {
        Ok(self
            .get(cf::BALANCES, &keys::balance_key(user_id, currency))?
            .unwrap_or(0))
    }

    fn material_quantity(
        &self,
        user_id: &UserId,
        material_id: &MaterialId,
        style_id: &StyleId,
    ) -> Result<i64> {
        Ok(self
            .get(
                cf::MATERIALS,
                &keys::material_key(user_id, material_id, style_id),
            )?
            .unwrap_or(0))
    }

    fn experience(&self, user_id: &UserId) -> Result<u64> {
        Ok(self
            .get(cf::PROGRESSION, &keys::progression_key(user_id))?
            .unwrap_or(0))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn get_balance(&self, user_id: &UserId, currency: CurrencyKind) -> Result<i64> {
        self.balance(user_id, currency)
    }

    fn apply_entry(&self, entry: LedgerEntry) -> Result<LedgerTransaction> {
        let mut ids = self.write_lock.lock();

        let previous = self.balance(&entry.user_id, entry.currency_kind)?;
        check_non_negative(&entry, previous)?;

        let currency = entry.currency_kind;
        let tx = entry
            .into_transaction(next_transaction_id(&mut ids)?, previous)
            .ok_or_else(|| StoreError::Overflow(format!("{currency} balance")))?;

        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_balances,
            keys::balance_key(&tx.user_id, tx.currency_kind),
            Self::serialize(&tx.new_balance)?,
        );
        batch.put_cf(
            &cf_tx,
            keys::transaction_key(&tx.transaction_id),
            Self::serialize(&tx)?,
        );
        batch.put_cf(
            &cf_tx_by_user,
            keys::user_transaction_key(&tx.user_id, &tx.transaction_id),
            [],
        );
        self.write(batch)?;

        Ok(tx)
    }

    fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<LedgerTransaction>> {
        self.get(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn list_transactions(
        &self,
        user_id: &UserId,
        currency: Option<CurrencyKind>,
    ) -> Result<Vec<LedgerTransaction>> {
        let prefix = keys::user_prefix(user_id);
        let mut transactions = Vec::new();

        for key in self.index_keys(cf::TRANSACTIONS_BY_USER, &prefix)? {
            let Some(tx_id) = keys::extract_transaction_id_from_user_key(&key) else {
                tracing::warn!(user_id = %user_id, "Skipping malformed transaction index key");
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                if currency.map_or(true, |c| tx.currency_kind == c) {
                    transactions.push(tx);
                }
            }
        }

        Ok(transactions)
    }

    // =========================================================================
    // Reward Operations
    // =========================================================================

    fn get_reward_operation(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<RewardOperation>> {
        self.get(cf::REWARD_OPERATIONS, &keys::operation_key(operation_id))
    }

    fn commit_reward(&self, writes: RewardWrites) -> Result<CommitOutcome> {
        let mut ids = self.write_lock.lock();

        if let Some(existing) = self.get_reward_operation(&writes.operation_id)? {
            return Ok(CommitOutcome::AlreadyApplied(existing));
        }

        let user_id = writes.user_id;
        let commit = writes.plan(self, &mut ids)?;

        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let cf_ops = self.cf(cf::REWARD_OPERATIONS)?;
        let cf_materials = self.cf(cf::MATERIALS)?;
        let cf_items = self.cf(cf::ITEMS)?;
        let cf_items_by_user = self.cf(cf::ITEMS_BY_USER)?;
        let cf_progression = self.cf(cf::PROGRESSION)?;

        let mut batch = WriteBatch::default();

        for tx in &commit.transactions {
            batch.put_cf(
                &cf_balances,
                keys::balance_key(&tx.user_id, tx.currency_kind),
                Self::serialize(&tx.new_balance)?,
            );
            batch.put_cf(
                &cf_tx,
                keys::transaction_key(&tx.transaction_id),
                Self::serialize(tx)?,
            );
            batch.put_cf(
                &cf_tx_by_user,
                keys::user_transaction_key(&tx.user_id, &tx.transaction_id),
                [],
            );
        }

        for ((material_id, style_id), total) in &commit.material_totals {
            batch.put_cf(
                &cf_materials,
                keys::material_key(&user_id, material_id, style_id),
                Self::serialize(total)?,
            );
        }

        for item in &commit.items {
            batch.put_cf(&cf_items, keys::item_key(&item.item_id), Self::serialize(item)?);
            batch.put_cf(
                &cf_items_by_user,
                keys::user_item_key(&item.user_id, &item.item_id),
                [],
            );
        }

        batch.put_cf(
            &cf_progression,
            keys::progression_key(&user_id),
            Self::serialize(&commit.total_experience)?,
        );
        batch.put_cf(
            &cf_ops,
            keys::operation_key(&commit.operation.operation_id),
            Self::serialize(&commit.operation)?,
        );

        self.write(batch)?;

        Ok(CommitOutcome::Applied(commit.operation))
    }

    // =========================================================================
    // Inventory and Progression
    // =========================================================================

    fn get_material_quantity(
        &self,
        user_id: &UserId,
        material_id: &MaterialId,
        style_id: &StyleId,
    ) -> Result<i64> {
        self.material_quantity(user_id, material_id, style_id)
    }

    fn list_items(&self, user_id: &UserId) -> Result<Vec<InventoryItem>> {
        let prefix = keys::user_prefix(user_id);
        let mut items = Vec::new();

        for key in self.index_keys(cf::ITEMS_BY_USER, &prefix)? {
            let Some(item_key) = key.get(16..) else {
                continue;
            };
            if let Some(item) = self.get::<InventoryItem>(cf::ITEMS, item_key)? {
                items.push(item);
            }
        }

        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    fn get_experience(&self, user_id: &UserId) -> Result<u64> {
        self.experience(user_id)
    }
}
