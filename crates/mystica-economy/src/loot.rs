//! Instant loot.
//!
//! The instant-loot path skips a real combat session: it picks an enemy for
//! the location, rolls its loot and applies it under a fresh operation id.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mystica_core::{
    AppliedMaterial, CurrencyKind, EconomyError, ItemGrant, ItemId, ItemTypeId, LocationId,
    MaterialStack, OperationId, Rarity, Result, RewardBundle, RewardResult, StyleId, UserId,
};

use crate::collaborators::{EnemySelector, Location, LocationLookup, LootGenerator, SelectedEnemy};
use crate::config::EconomyConfig;
use crate::rewards::RewardEngine;

/// Combat statistics attached to a loot result.
///
/// Always zero on the instant-loot path since no fight took place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSummary {
    /// Turns fought.
    pub turns: u32,
    /// Damage the player dealt.
    pub damage_dealt: u64,
    /// Damage the player took.
    pub damage_taken: u64,
}

/// An item as shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootItem {
    /// Persisted identity. `None` only if no row was created for this grant.
    pub item_id: Option<ItemId>,
    /// Item template.
    pub item_type_id: ItemTypeId,
    /// Final name when persisted, otherwise the provisional one.
    pub name: String,
    /// Rarity.
    pub rarity: Rarity,
    /// Style variant.
    pub style_id: StyleId,
    /// Level the item was created at.
    pub level: u32,
    /// Pre-applied materials.
    pub applied_materials: Vec<AppliedMaterial>,
}

/// What a player receives from instant loot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantLootResult {
    /// Operation the rewards were applied under.
    pub operation_id: OperationId,
    /// Where the loot was collected.
    pub location: Location,
    /// The enemy the loot was rolled for.
    pub enemy: SelectedEnemy,
    /// Level used for selection and rolls.
    pub level: u32,
    /// Zeroed combat statistics.
    pub combat: CombatSummary,
    /// Currency credited, per kind.
    pub currencies: BTreeMap<CurrencyKind, i64>,
    /// Balances after the credits.
    pub final_currency_balances: BTreeMap<CurrencyKind, i64>,
    /// Material stacks granted.
    pub materials: Vec<MaterialStack>,
    /// Items granted, in roll order.
    pub items: Vec<LootItem>,
    /// Experience granted.
    pub experience: u64,
}

/// Composes enemy selection, loot generation and reward application.
pub struct LootOrchestrator {
    locations: Arc<dyn LocationLookup>,
    enemies: Arc<dyn EnemySelector>,
    loot: Arc<dyn LootGenerator>,
    engine: RewardEngine,
    config: EconomyConfig,
}

impl LootOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        locations: Arc<dyn LocationLookup>,
        enemies: Arc<dyn EnemySelector>,
        loot: Arc<dyn LootGenerator>,
        engine: RewardEngine,
        config: EconomyConfig,
    ) -> Self {
        Self {
            locations,
            enemies,
            loot,
            engine,
            config,
        }
    }

    /// Roll and grant loot for `location_id` without a combat session.
    ///
    /// # Errors
    ///
    /// - `EconomyError::NotFound` if the location does not exist, or if the
    ///   enemy selector finds nothing to spawn. Nothing is granted.
    /// - `EconomyError::External` for any other enemy selector or loot
    ///   generator failure.
    /// - `EconomyError::Reward` if applying the rolled bundle fails.
    pub async fn collect_instant_loot(
        &self,
        user_id: &UserId,
        location_id: &LocationId,
    ) -> Result<InstantLootResult> {
        let location = self
            .locations
            .get_by_id(location_id)
            .await?
            .ok_or_else(|| EconomyError::not_found("location", location_id))?;

        let level = self.config.instant_loot_level;
        let enemy = self
            .enemies
            .select_enemy(location_id, level)
            .await
            .map_err(collaborator_failure("enemy_selector"))?;
        let bundle = self
            .loot
            .generate_loot(location_id, level, &enemy.id, &enemy.style_id)
            .await
            .map_err(collaborator_failure("loot_generator"))?;

        let operation_id = OperationId::generate();
        tracing::debug!(
            user_id = %user_id,
            location_id = %location_id,
            enemy_id = %enemy.id,
            operation_id = %operation_id,
            level,
            "Instant loot rolled"
        );

        let applied = self
            .engine
            .apply_rewards(user_id, operation_id, &bundle, level)?;
        let items = merge_items(&bundle, &applied.result, level);
        let result = applied.result;

        Ok(InstantLootResult {
            operation_id,
            location,
            enemy,
            level,
            combat: CombatSummary::default(),
            currencies: result.currencies_granted,
            final_currency_balances: result.final_currency_balances,
            materials: result.materials_granted,
            items,
            experience: result.experience_granted,
        })
    }
}

/// Report a selector or generator failure as that collaborator's fault.
/// Lookups that found nothing stay `NotFound`.
fn collaborator_failure(service: &'static str) -> impl FnOnce(EconomyError) -> EconomyError {
    move |err| match err {
        EconomyError::NotFound { .. } | EconomyError::External { .. } => err,
        other => {
            tracing::warn!(service, error = %other, "Instant loot collaborator failed");
            EconomyError::external(service, other)
        }
    }
}

/// Overlay persisted items onto the bundle's provisional list, by position.
fn merge_items(bundle: &RewardBundle, result: &RewardResult, level: u32) -> Vec<LootItem> {
    bundle
        .items
        .iter()
        .enumerate()
        .map(|(index, grant)| match result.created_items.get(index) {
            Some(created) => LootItem {
                item_id: Some(created.item_id),
                item_type_id: created.item_type_id,
                name: created.name.clone(),
                rarity: created.rarity,
                style_id: created.style_id,
                level: created.level,
                applied_materials: created.applied_materials.clone(),
            },
            None => provisional(grant, level),
        })
        .collect()
}

fn provisional(grant: &ItemGrant, level: u32) -> LootItem {
    LootItem {
        item_id: None,
        item_type_id: grant.item_type_id,
        name: grant.name.clone(),
        rarity: grant.rarity,
        style_id: grant.style_id,
        level,
        applied_materials: grant.applied_materials.clone(),
    }
}
