//! Interfaces to the collaborators the economy core calls into.
//!
//! Location lookup, enemy selection and loot generation are async because
//! real implementations sit behind a database or another service. Item and
//! material persistence stage into a [`RewardWrites`] unit and never write on
//! their own; the store commits the unit as a whole.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use mystica_core::{
    EnemyTypeId, InventoryItem, ItemGrant, ItemId, LocationId, MaterialGrant, Result,
    RewardBundle, StyleId, UserId,
};
use mystica_store::RewardWrites;

/// A lootable map location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Location identifier.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Category such as `"library"` or `"gym"`.
    pub location_type: String,
}

/// An enemy chosen for an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedEnemy {
    /// Enemy type.
    pub id: EnemyTypeId,
    /// Its style variant.
    pub style_id: StyleId,
}

/// Resolves locations by id.
#[async_trait]
pub trait LocationLookup: Send + Sync {
    /// Get a location, `None` if it does not exist.
    async fn get_by_id(&self, location_id: &LocationId) -> Result<Option<Location>>;
}

/// Picks an enemy for a location.
#[async_trait]
pub trait EnemySelector: Send + Sync {
    /// Select a weighted-random enemy valid for `location_id` at `level`.
    async fn select_enemy(&self, location_id: &LocationId, level: u32) -> Result<SelectedEnemy>;
}

/// Rolls rewards for a defeated enemy.
#[async_trait]
pub trait LootGenerator: Send + Sync {
    /// Produce a fresh reward bundle.
    async fn generate_loot(
        &self,
        location_id: &LocationId,
        level: u32,
        enemy_id: &EnemyTypeId,
        enemy_style_id: &StyleId,
    ) -> Result<RewardBundle>;
}

/// Creates concrete item rows for item grants.
pub trait ItemPersistence: Send + Sync {
    /// Stage an item row for `grant` and return it.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the item cannot be created; the
    /// whole reward operation is then abandoned.
    fn create_item(
        &self,
        writes: &mut RewardWrites,
        grant: &ItemGrant,
        level: u32,
    ) -> Result<InventoryItem>;
}

/// Adds material stacks to a player's inventory.
pub trait MaterialPersistence: Send + Sync {
    /// Stage a material grant.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the grant cannot be made; the
    /// whole reward operation is then abandoned.
    fn grant_material(&self, writes: &mut RewardWrites, grant: &MaterialGrant) -> Result<()>;
}

/// Default persistence: stages rows straight into the store's unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct StagedPersistence;

impl ItemPersistence for StagedPersistence {
    fn create_item(
        &self,
        writes: &mut RewardWrites,
        grant: &ItemGrant,
        level: u32,
    ) -> Result<InventoryItem> {
        let item = new_item(writes.user_id, grant, level);
        writes.stage_item(item.clone());
        Ok(item)
    }
}

impl MaterialPersistence for StagedPersistence {
    fn grant_material(&self, writes: &mut RewardWrites, grant: &MaterialGrant) -> Result<()> {
        writes.stage_material(grant.clone())?;
        Ok(())
    }
}

/// Build a fresh item row for `grant`.
#[must_use]
pub fn new_item(user_id: UserId, grant: &ItemGrant, level: u32) -> InventoryItem {
    InventoryItem {
        item_id: ItemId::generate(),
        user_id,
        item_type_id: grant.item_type_id,
        name: grant.name.clone(),
        rarity: grant.rarity,
        style_id: grant.style_id,
        level,
        applied_materials: grant.applied_materials.clone(),
        created_at: Utc::now(),
    }
}
