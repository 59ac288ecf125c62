//! Reward application.
//!
//! [`RewardEngine::apply_rewards`] turns a [`RewardBundle`] into persisted
//! grants exactly once per [`OperationId`]. Every grant is staged into one
//! [`RewardWrites`] unit and the store commits it in a single atomic step, so a
//! failure anywhere leaves nothing behind and the same operation id can simply
//! be retried.

use std::sync::Arc;

use mystica_core::{
    AppliedRewards, ApplyOutcome, EconomyError, OperationId, Result, RewardBundle,
    RewardOperation, UserId,
};
use mystica_store::{CommitOutcome, RewardWrites, Store};

use crate::collaborators::{ItemPersistence, MaterialPersistence, StagedPersistence};

/// Applies reward bundles idempotently.
#[derive(Clone)]
pub struct RewardEngine {
    store: Arc<dyn Store>,
    items: Arc<dyn ItemPersistence>,
    materials: Arc<dyn MaterialPersistence>,
}

impl RewardEngine {
    /// Create an engine that stages item and material rows directly.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_persistence(
            store,
            Arc::new(StagedPersistence),
            Arc::new(StagedPersistence),
        )
    }

    /// Create an engine with custom item and material persistence.
    #[must_use]
    pub fn with_persistence(
        store: Arc<dyn Store>,
        items: Arc<dyn ItemPersistence>,
        materials: Arc<dyn MaterialPersistence>,
    ) -> Self {
        Self {
            store,
            items,
            materials,
        }
    }

    /// Apply `bundle` to `user_id` under `operation_id`.
    ///
    /// A replay of an already-applied operation id returns the recorded
    /// result with [`ApplyOutcome::AlreadyApplied`] and grants nothing.
    ///
    /// # Errors
    ///
    /// Every error is wrapped in `EconomyError::Reward` carrying the operation
    /// id. The wrapped error is:
    ///
    /// - `EconomyError::Validation` for a malformed bundle, a level below 1,
    ///   an overflowing grant, or an operation id already used by another user.
    ///   Not retryable.
    /// - `EconomyError::Persistence` if staging or the commit fails. Nothing
    ///   was written; retrying with the same operation id is safe.
    pub fn apply_rewards(
        &self,
        user_id: &UserId,
        operation_id: OperationId,
        bundle: &RewardBundle,
        context_level: u32,
    ) -> Result<AppliedRewards> {
        self.apply(user_id, operation_id, bundle, context_level)
            .map_err(|e| {
                tracing::warn!(
                    user_id = %user_id,
                    operation_id = %operation_id,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Reward application failed"
                );
                e.in_operation(operation_id)
            })
    }

    /// The recorded operation, if any.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the store fails.
    pub fn get_operation(&self, operation_id: &OperationId) -> Result<Option<RewardOperation>> {
        Ok(self.store.get_reward_operation(operation_id)?)
    }

    fn apply(
        &self,
        user_id: &UserId,
        operation_id: OperationId,
        bundle: &RewardBundle,
        context_level: u32,
    ) -> Result<AppliedRewards> {
        if let Some(existing) = self.store.get_reward_operation(&operation_id)? {
            return replay(user_id, existing);
        }

        bundle.validate()?;
        if context_level == 0 {
            return Err(EconomyError::validation("context level must be at least 1"));
        }

        let writes = self.stage(user_id, operation_id, bundle, context_level)?;

        match self.store.commit_reward(writes)? {
            CommitOutcome::Applied(operation) => {
                let result = operation.result;
                tracing::info!(
                    user_id = %user_id,
                    operation_id = %operation_id,
                    items = result.created_items.len(),
                    materials = result.materials_granted.len(),
                    experience = result.experience_granted,
                    "Rewards applied"
                );
                Ok(AppliedRewards {
                    operation_id,
                    outcome: ApplyOutcome::Applied,
                    result,
                })
            }
            // Lost a race with a concurrent apply of the same operation id.
            CommitOutcome::AlreadyApplied(existing) => replay(user_id, existing),
        }
    }

    fn stage(
        &self,
        user_id: &UserId,
        operation_id: OperationId,
        bundle: &RewardBundle,
        context_level: u32,
    ) -> Result<RewardWrites> {
        let mut writes = RewardWrites::new(operation_id, *user_id, bundle.source);

        for (currency, amount) in &bundle.currencies {
            writes.stage_credit(*currency, *amount)?;
        }
        for grant in &bundle.materials {
            self.materials.grant_material(&mut writes, grant)?;
        }
        for grant in &bundle.items {
            let item = self.items.create_item(&mut writes, grant, context_level)?;
            tracing::debug!(
                operation_id = %operation_id,
                item_id = %item.item_id,
                item_type_id = %item.item_type_id,
                "Item staged"
            );
        }
        writes.stage_experience(bundle.experience)?;

        Ok(writes)
    }
}

fn replay(user_id: &UserId, existing: RewardOperation) -> Result<AppliedRewards> {
    if existing.user_id != *user_id {
        return Err(EconomyError::validation(format!(
            "operation {} was applied for a different user",
            existing.operation_id
        )));
    }

    tracing::info!(
        user_id = %user_id,
        operation_id = %existing.operation_id,
        "Reward operation already applied, returning recorded result"
    );

    Ok(AppliedRewards {
        operation_id: existing.operation_id,
        outcome: ApplyOutcome::AlreadyApplied,
        result: existing.result,
    })
}
