//! Staged writes for one reward operation.
//!
//! Reward application stages every grant into a [`RewardWrites`] first; nothing
//! touches the store until [`Store::commit_reward`](crate::Store::commit_reward)
//! turns the whole unit into one atomic write. A failure while staging simply
//! drops the unit.

use std::collections::BTreeMap;

use chrono::Utc;
use mystica_core::{
    CurrencyKind, EntryKind, InventoryItem, LedgerEntry, LedgerTransaction, MaterialGrant,
    MaterialId, MaterialStack, Metadata, OperationId, RewardOperation, RewardResult, SourceKind,
    StyleId, TransactionIdGenerator, UserId,
};

use crate::error::{Result, StoreError};

/// Everything one reward operation will write.
#[derive(Debug, Clone)]
pub struct RewardWrites {
    /// Idempotency key.
    pub operation_id: OperationId,
    /// Recipient.
    pub user_id: UserId,
    /// Source kind for the currency credits.
    pub source: SourceKind,
    credits: BTreeMap<CurrencyKind, i64>,
    materials: Vec<MaterialGrant>,
    /// Item rows to insert, in order.
    pub items: Vec<InventoryItem>,
    /// Experience to add.
    pub experience: u64,
}

impl RewardWrites {
    /// Start an empty unit for `operation_id`.
    #[must_use]
    pub fn new(operation_id: OperationId, user_id: UserId, source: SourceKind) -> Self {
        Self {
            operation_id,
            user_id,
            source,
            credits: BTreeMap::new(),
            materials: Vec::new(),
            items: Vec::new(),
            experience: 0,
        }
    }

    /// Stage a currency credit. Repeated credits of one kind accumulate.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidWrite` if `amount` is negative.
    /// - `StoreError::Overflow` if the staged amount overflows.
    pub fn stage_credit(&mut self, currency: CurrencyKind, amount: i64) -> Result<()> {
        if amount < 0 {
            return Err(StoreError::InvalidWrite(format!(
                "{currency} credit must be non-negative, got {amount}"
            )));
        }
        let staged = self.credits.entry(currency).or_insert(0);
        *staged = staged
            .checked_add(amount)
            .ok_or_else(|| StoreError::Overflow(format!("staged {currency} credit")))?;
        Ok(())
    }

    /// Stage a material grant.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidWrite` if the quantity is not positive.
    pub fn stage_material(&mut self, grant: MaterialGrant) -> Result<()> {
        if grant.quantity <= 0 {
            return Err(StoreError::InvalidWrite(format!(
                "material {} quantity must be positive, got {}",
                grant.material_id, grant.quantity
            )));
        }
        self.materials.push(grant);
        Ok(())
    }

    /// Currency staged so far, per kind.
    #[must_use]
    pub fn credits(&self) -> &BTreeMap<CurrencyKind, i64> {
        &self.credits
    }

    /// Material grants staged so far, in order.
    #[must_use]
    pub fn materials(&self) -> &[MaterialGrant] {
        &self.materials
    }

    /// Stage an item row.
    pub fn stage_item(&mut self, item: InventoryItem) {
        self.items.push(item);
    }

    /// Stage experience.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Overflow` if the staged total overflows.
    pub fn stage_experience(&mut self, experience: u64) -> Result<()> {
        self.experience = self
            .experience
            .checked_add(experience)
            .ok_or_else(|| StoreError::Overflow("staged experience".into()))?;
        Ok(())
    }

    /// Resolve the staged unit against current persisted values.
    ///
    /// Must be called with the store's write lock held, and its output written
    /// in one batch. Transaction ids come from `ids` in commit order.
    pub(crate) fn plan(
        self,
        current: &impl CommitSource,
        ids: &mut TransactionIdGenerator,
    ) -> Result<RewardCommit> {
        let user_id = self.user_id;

        let mut balances = BTreeMap::new();
        let mut transactions = Vec::new();
        let mut currencies_granted = BTreeMap::new();
        for currency in CurrencyKind::ALL {
            let previous = current.balance(&user_id, currency)?;
            let amount = self.credits.get(&currency).copied().unwrap_or(0);
            if amount == 0 {
                balances.insert(currency, previous);
                continue;
            }

            let entry = LedgerEntry {
                user_id,
                currency_kind: currency,
                delta: amount,
                kind: EntryKind::Source(self.source),
                source_id: Some(self.operation_id.to_string()),
                metadata: Metadata::new(),
            };
            crate::check_non_negative(&entry, previous)?;
            let tx = entry
                .into_transaction(crate::next_transaction_id(ids)?, previous)
                .ok_or_else(|| StoreError::Overflow(format!("{currency} balance")))?;
            balances.insert(currency, tx.new_balance);
            currencies_granted.insert(currency, amount);
            transactions.push(tx);
        }

        let mut material_totals: BTreeMap<(MaterialId, StyleId), i64> = BTreeMap::new();
        let mut materials_granted = Vec::with_capacity(self.materials.len());
        for grant in self.materials {
            let key = (grant.material_id, grant.style_id);
            let total = match material_totals.get(&key) {
                Some(total) => *total,
                None => current.material_quantity(&user_id, &grant.material_id, &grant.style_id)?,
            };
            let total = total
                .checked_add(grant.quantity)
                .ok_or_else(|| StoreError::Overflow(format!("material {}", grant.material_id)))?;
            material_totals.insert(key, total);
            materials_granted.push(MaterialStack {
                material_id: grant.material_id,
                style_id: grant.style_id,
                quantity_granted: grant.quantity,
                total_quantity: total,
            });
        }

        let total_experience = current
            .experience(&user_id)?
            .checked_add(self.experience)
            .ok_or_else(|| StoreError::Overflow("experience".into()))?;

        let result = RewardResult {
            created_items: self.items.clone(),
            currencies_granted,
            final_currency_balances: balances,
            materials_granted,
            experience_granted: self.experience,
            total_experience,
        };

        Ok(RewardCommit {
            transactions,
            material_totals,
            items: self.items,
            total_experience,
            operation: RewardOperation {
                operation_id: self.operation_id,
                user_id,
                result,
                applied_at: Utc::now(),
            },
        })
    }
}

/// Current persisted values a reward commit builds on.
pub(crate) trait CommitSource {
    fn balance(&self, user_id: &UserId, currency: CurrencyKind) -> Result<i64>;

    fn material_quantity(
        &self,
        user_id: &UserId,
        material_id: &MaterialId,
        style_id: &StyleId,
    ) -> Result<i64>;

    fn experience(&self, user_id: &UserId) -> Result<u64>;
}

/// A fully resolved reward operation, ready to be written in one batch.
#[derive(Debug)]
pub(crate) struct RewardCommit {
    pub transactions: Vec<LedgerTransaction>,
    pub material_totals: BTreeMap<(MaterialId, StyleId), i64>,
    pub items: Vec<InventoryItem>,
    pub total_experience: u64,
    pub operation: RewardOperation,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        gold: i64,
        material: i64,
        experience: u64,
    }

    impl CommitSource for Fixed {
        fn balance(&self, _: &UserId, currency: CurrencyKind) -> Result<i64> {
            Ok(match currency {
                CurrencyKind::Gold => self.gold,
                CurrencyKind::Gems => 0,
            })
        }

        fn material_quantity(&self, _: &UserId, _: &MaterialId, _: &StyleId) -> Result<i64> {
            Ok(self.material)
        }

        fn experience(&self, _: &UserId) -> Result<u64> {
            Ok(self.experience)
        }
    }

    #[test]
    fn plan_tags_credits_with_operation() {
        let op = OperationId::generate();
        let mut writes = RewardWrites::new(op, UserId::generate(), SourceKind::CombatVictory);
        writes.stage_credit(CurrencyKind::Gold, 30).unwrap();

        let commit = writes
            .plan(
                &Fixed {
                    gold: 70,
                    material: 0,
                    experience: 0,
                },
                &mut TransactionIdGenerator::new(),
            )
            .unwrap();

        assert_eq!(commit.transactions.len(), 1);
        let tx = &commit.transactions[0];
        assert_eq!(tx.previous_balance, 70);
        assert_eq!(tx.new_balance, 100);
        assert_eq!(tx.source_id.as_deref(), Some(op.to_string().as_str()));
        assert_eq!(
            tx.source_or_sink_kind,
            EntryKind::Source(SourceKind::CombatVictory)
        );

        let result = &commit.operation.result;
        assert_eq!(result.final_currency_balances[&CurrencyKind::Gold], 100);
        assert_eq!(result.final_currency_balances[&CurrencyKind::Gems], 0);
        assert!(!result.currencies_granted.contains_key(&CurrencyKind::Gems));
    }

    #[test]
    fn repeated_material_grants_accumulate() {
        let mut writes =
            RewardWrites::new(OperationId::generate(), UserId::generate(), SourceKind::Admin);
        let grant = MaterialGrant {
            material_id: MaterialId::generate(),
            style_id: StyleId::generate(),
            quantity: 2,
        };
        writes.stage_material(grant.clone()).unwrap();
        writes.stage_material(grant.clone()).unwrap();
        writes.stage_experience(40).unwrap();

        let commit = writes
            .plan(
                &Fixed {
                    gold: 0,
                    material: 5,
                    experience: 100,
                },
                &mut TransactionIdGenerator::new(),
            )
            .unwrap();

        let stacks = &commit.operation.result.materials_granted;
        assert_eq!(stacks[0].total_quantity, 7);
        assert_eq!(stacks[1].total_quantity, 9);
        assert_eq!(
            commit.material_totals[&(grant.material_id, grant.style_id)],
            9
        );
        assert_eq!(commit.total_experience, 140);
        assert!(commit.transactions.is_empty());
    }

    #[test]
    fn overflowing_credit_fails_planning() {
        let mut writes =
            RewardWrites::new(OperationId::generate(), UserId::generate(), SourceKind::Admin);
        writes.stage_credit(CurrencyKind::Gold, 10).unwrap();

        let result = writes.plan(
            &Fixed {
                gold: i64::MAX,
                material: 0,
                experience: 0,
            },
            &mut TransactionIdGenerator::new(),
        );
        assert!(matches!(result, Err(StoreError::Overflow(_))));
    }

    #[test]
    fn negative_credit_cannot_be_staged() {
        let mut writes =
            RewardWrites::new(OperationId::generate(), UserId::generate(), SourceKind::Admin);
        writes.stage_credit(CurrencyKind::Gold, 10).unwrap();

        let result = writes.stage_credit(CurrencyKind::Gold, -50);

        assert!(matches!(result, Err(StoreError::InvalidWrite(_))));
        assert_eq!(writes.credits()[&CurrencyKind::Gold], 10);
    }

    #[test]
    fn non_positive_material_cannot_be_staged() {
        let mut writes =
            RewardWrites::new(OperationId::generate(), UserId::generate(), SourceKind::Admin);
        let grant = MaterialGrant {
            material_id: MaterialId::generate(),
            style_id: StyleId::generate(),
            quantity: -3,
        };

        assert!(matches!(
            writes.stage_material(grant),
            Err(StoreError::InvalidWrite(_))
        ));
        assert!(writes.materials().is_empty());
    }

    #[test]
    fn planned_transactions_take_increasing_ids() {
        let mut writes =
            RewardWrites::new(OperationId::generate(), UserId::generate(), SourceKind::Admin);
        writes.stage_credit(CurrencyKind::Gold, 5).unwrap();
        writes.stage_credit(CurrencyKind::Gems, 1).unwrap();

        let commit = writes
            .plan(
                &Fixed {
                    gold: 0,
                    material: 0,
                    experience: 0,
                },
                &mut TransactionIdGenerator::new(),
            )
            .unwrap();

        assert_eq!(commit.transactions.len(), 2);
        assert!(commit.transactions[0].transaction_id < commit.transactions[1].transaction_id);
    }
}
