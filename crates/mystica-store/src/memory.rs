//! In-memory storage implementation.
//!
//! All state lives behind one mutex; every trait method holds it for its whole
//! read-check-write sequence, which linearizes concurrent mutations. Transaction
//! ids are minted while that mutex is held, so id order is commit order.

use std::collections::HashMap;

use parking_lot::Mutex;

use mystica_core::{
    CurrencyKind, InventoryItem, LedgerEntry, LedgerTransaction, MaterialId, OperationId,
    RewardOperation, StyleId, TransactionId, TransactionIdGenerator, UserId,
};

use crate::error::{Result, StoreError};
use crate::writes::{CommitSource, RewardWrites};
use crate::{check_non_negative, next_transaction_id, CommitOutcome, Store};

#[derive(Debug, Default)]
struct State {
    balances: HashMap<(UserId, CurrencyKind), i64>,
    /// Append-only, in commit order.
    transactions: Vec<LedgerTransaction>,
    operations: HashMap<OperationId, RewardOperation>,
    materials: HashMap<(UserId, MaterialId, StyleId), i64>,
    items: Vec<InventoryItem>,
    experience: HashMap<UserId, u64>,
}

impl CommitSource for State {
    fn balance(&self, user_id: &UserId, currency: CurrencyKind) -> Result<i64> {
        Ok(self
            .balances
            .get(&(*user_id, currency))
            .copied()
            .unwrap_or(0))
    }

    fn material_quantity(
        &self,
        user_id: &UserId,
        material_id: &MaterialId,
        style_id: &StyleId,
    ) -> Result<i64> {
        Ok(self
            .materials
            .get(&(*user_id, *material_id, *style_id))
            .copied()
            .unwrap_or(0))
    }

    fn experience(&self, user_id: &UserId) -> Result<u64> {
        Ok(self.experience.get(user_id).copied().unwrap_or(0))
    }
}

/// Process-local storage backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Only locked while `state` is held.
    ids: Mutex<TransactionIdGenerator>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_balance(&self, user_id: &UserId, currency: CurrencyKind) -> Result<i64> {
        self.state.lock().balance(user_id, currency)
    }

    fn apply_entry(&self, entry: LedgerEntry) -> Result<LedgerTransaction> {
        let mut state = self.state.lock();

        let key = (entry.user_id, entry.currency_kind);
        let previous = state.balances.get(&key).copied().unwrap_or(0);
        check_non_negative(&entry, previous)?;

        let currency = entry.currency_kind;
        let transaction_id = next_transaction_id(&mut self.ids.lock())?;
        let tx = entry
            .into_transaction(transaction_id, previous)
            .ok_or_else(|| StoreError::Overflow(format!("{currency} balance")))?;

        state.balances.insert(key, tx.new_balance);
        state.transactions.push(tx.clone());

        Ok(tx)
    }

    fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<LedgerTransaction>> {
        Ok(self
            .state
            .lock()
            .transactions
            .iter()
            .find(|tx| tx.transaction_id == *transaction_id)
            .cloned())
    }

    fn list_transactions(
        &self,
        user_id: &UserId,
        currency: Option<CurrencyKind>,
    ) -> Result<Vec<LedgerTransaction>> {
        Ok(self
            .state
            .lock()
            .transactions
            .iter()
            .filter(|tx| tx.user_id == *user_id)
            .filter(|tx| currency.map_or(true, |c| tx.currency_kind == c))
            .cloned()
            .collect())
    }

    fn get_reward_operation(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<RewardOperation>> {
        Ok(self.state.lock().operations.get(operation_id).cloned())
    }

    fn commit_reward(&self, writes: RewardWrites) -> Result<CommitOutcome> {
        let mut state = self.state.lock();

        if let Some(existing) = state.operations.get(&writes.operation_id) {
            return Ok(CommitOutcome::AlreadyApplied(existing.clone()));
        }

        // Resolve everything before the first mutation so a failure leaves
        // the state untouched.
        let user_id = writes.user_id;
        let commit = writes.plan(&*state, &mut self.ids.lock())?;

        for tx in &commit.transactions {
            state
                .balances
                .insert((tx.user_id, tx.currency_kind), tx.new_balance);
        }
        state.transactions.extend(commit.transactions);
        for ((material_id, style_id), total) in commit.material_totals {
            state
                .materials
                .insert((user_id, material_id, style_id), total);
        }
        state.items.extend(commit.items);
        state.experience.insert(user_id, commit.total_experience);
        state
            .operations
            .insert(commit.operation.operation_id, commit.operation.clone());

        Ok(CommitOutcome::Applied(commit.operation))
    }

    fn get_material_quantity(
        &self,
        user_id: &UserId,
        material_id: &MaterialId,
        style_id: &StyleId,
    ) -> Result<i64> {
        self.state
            .lock()
            .material_quantity(user_id, material_id, style_id)
    }

    fn list_items(&self, user_id: &UserId) -> Result<Vec<InventoryItem>> {
        Ok(self
            .state
            .lock()
            .items
            .iter()
            .filter(|item| item.user_id == *user_id)
            .cloned()
            .collect())
    }

    fn get_experience(&self, user_id: &UserId) -> Result<u64> {
        self.state.lock().experience(user_id)
    }
}
