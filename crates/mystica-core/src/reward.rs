//! Reward bundles and the results of applying them.
//!
//! A [`RewardBundle`] is produced by loot generation for one game event and is
//! never persisted as-is. Applying it under an [`OperationId`] yields a
//! [`RewardResult`], which is stored with the operation so that replays return
//! exactly what the first application returned.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyKind, SourceKind};
use crate::error::{EconomyError, Result};
use crate::{ItemId, ItemTypeId, MaterialId, OperationId, StyleId, UserId};

/// Number of material slots on an item. Slot indices run `0..MATERIAL_SLOT_COUNT`.
pub const MATERIAL_SLOT_COUNT: u8 = 3;

/// Item rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Most drops.
    Common,
    /// Slightly better stats.
    Uncommon,
    /// Uncommon drop.
    Rare,
    /// Very rare drop.
    Epic,
    /// Top tier.
    Legendary,
}

/// A material already bound to one of an item's slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMaterial {
    /// The material.
    pub material_id: MaterialId,
    /// Its style variant.
    pub style_id: StyleId,
    /// Slot on the item, `0..MATERIAL_SLOT_COUNT`.
    pub slot_index: u8,
}

/// A stack of crafting material to add to the player's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialGrant {
    /// The material.
    pub material_id: MaterialId,
    /// Its style variant.
    pub style_id: StyleId,
    /// How many to grant. Must be positive.
    pub quantity: i64,
}

/// An item to create. Rarity and style are already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGrant {
    /// Item template.
    pub item_type_id: ItemTypeId,
    /// Provisional display name.
    pub name: String,
    /// Resolved rarity.
    pub rarity: Rarity,
    /// Resolved style.
    pub style_id: StyleId,
    /// Materials that come pre-applied.
    #[serde(default)]
    pub applied_materials: Vec<AppliedMaterial>,
}

/// Everything one game event grants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardBundle {
    /// Currency to credit, per kind. Deltas must be non-negative.
    #[serde(default)]
    pub currencies: BTreeMap<CurrencyKind, i64>,
    /// Material stacks, in grant order.
    #[serde(default)]
    pub materials: Vec<MaterialGrant>,
    /// Items, in grant order.
    #[serde(default)]
    pub items: Vec<ItemGrant>,
    /// Experience points.
    #[serde(default)]
    pub experience: u64,
    /// Source kind used to tag the currency credits.
    #[serde(default)]
    pub source: SourceKind,
}

impl RewardBundle {
    /// Reject bundles that could never be applied.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Validation` for negative currency deltas,
    /// non-positive material quantities, and out-of-range or duplicate
    /// material slot indices.
    pub fn validate(&self) -> Result<()> {
        for (currency, delta) in &self.currencies {
            if *delta < 0 {
                return Err(EconomyError::validation(format!(
                    "negative {currency} delta in reward bundle: {delta}"
                )));
            }
        }

        for grant in &self.materials {
            if grant.quantity <= 0 {
                return Err(EconomyError::validation(format!(
                    "material {} has non-positive quantity {}",
                    grant.material_id, grant.quantity
                )));
            }
        }

        for item in &self.items {
            let mut used = BTreeSet::new();
            for applied in &item.applied_materials {
                if applied.slot_index >= MATERIAL_SLOT_COUNT {
                    return Err(EconomyError::validation(format!(
                        "item {} has material in slot {} (max {})",
                        item.item_type_id,
                        applied.slot_index,
                        MATERIAL_SLOT_COUNT - 1
                    )));
                }
                if !used.insert(applied.slot_index) {
                    return Err(EconomyError::validation(format!(
                        "item {} has two materials in slot {}",
                        item.item_type_id, applied.slot_index
                    )));
                }
            }
        }

        Ok(())
    }

    /// Whether the bundle grants nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currencies.values().all(|delta| *delta == 0)
            && self.materials.is_empty()
            && self.items.is_empty()
            && self.experience == 0
    }
}

/// A concrete item row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Final identity.
    pub item_id: ItemId,
    /// Owner.
    pub user_id: UserId,
    /// Item template.
    pub item_type_id: ItemTypeId,
    /// Final display name.
    pub name: String,
    /// Rarity.
    pub rarity: Rarity,
    /// Style variant.
    pub style_id: StyleId,
    /// Item level.
    pub level: u32,
    /// Materials bound to slots.
    pub applied_materials: Vec<AppliedMaterial>,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

/// A material grant as it landed in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialStack {
    /// The material.
    pub material_id: MaterialId,
    /// Its style variant.
    pub style_id: StyleId,
    /// Quantity added by this grant.
    pub quantity_granted: i64,
    /// Stack size after this grant.
    pub total_quantity: i64,
}

/// What applying a reward bundle produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardResult {
    /// Items created, in bundle order.
    pub created_items: Vec<InventoryItem>,
    /// Currency credited, per kind.
    pub currencies_granted: BTreeMap<CurrencyKind, i64>,
    /// Balances for every currency kind after the credits.
    pub final_currency_balances: BTreeMap<CurrencyKind, i64>,
    /// Material stacks, in bundle order.
    pub materials_granted: Vec<MaterialStack>,
    /// Experience added.
    pub experience_granted: u64,
    /// Experience total after the grant.
    pub total_experience: u64,
}

/// The persisted record of an applied reward operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardOperation {
    /// Idempotency key.
    pub operation_id: OperationId,
    /// Who received the rewards.
    pub user_id: UserId,
    /// What the first application returned.
    pub result: RewardResult,
    /// When it was applied.
    pub applied_at: DateTime<Utc>,
}

/// Whether a call applied the bundle or replayed an earlier application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// This call granted the rewards.
    Applied,
    /// The operation id was already applied; nothing was granted.
    AlreadyApplied,
}

/// Return value of a reward application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRewards {
    /// Idempotency key.
    pub operation_id: OperationId,
    /// Applied or replayed.
    pub outcome: ApplyOutcome,
    /// The recorded result.
    pub result: RewardResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(applied_materials: Vec<AppliedMaterial>) -> ItemGrant {
        ItemGrant {
            item_type_id: ItemTypeId::generate(),
            name: "Rusty Sword".into(),
            rarity: Rarity::Common,
            style_id: StyleId::generate(),
            applied_materials,
        }
    }

    fn applied(slot_index: u8) -> AppliedMaterial {
        AppliedMaterial {
            material_id: MaterialId::generate(),
            style_id: StyleId::generate(),
            slot_index,
        }
    }

    #[test]
    fn default_bundle_is_empty_and_valid() {
        let bundle = RewardBundle::default();
        assert!(bundle.is_empty());
        assert!(bundle.validate().is_ok());
    }

    #[test]
    fn default_source_is_combat_victory() {
        let bundle: RewardBundle = serde_json::from_str("{}").unwrap();
        assert_eq!(bundle.source, SourceKind::CombatVictory);
        assert_eq!(RewardBundle::default().source, SourceKind::CombatVictory);
    }

    #[test]
    fn negative_currency_delta_is_rejected() {
        let mut bundle = RewardBundle::default();
        bundle.currencies.insert(CurrencyKind::Gold, -5);
        assert!(matches!(
            bundle.validate(),
            Err(EconomyError::Validation { .. })
        ));
    }

    #[test]
    fn zero_quantity_material_is_rejected() {
        let bundle = RewardBundle {
            materials: vec![MaterialGrant {
                material_id: MaterialId::generate(),
                style_id: StyleId::generate(),
                quantity: 0,
            }],
            ..RewardBundle::default()
        };
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let bundle = RewardBundle {
            items: vec![item(vec![applied(MATERIAL_SLOT_COUNT)])],
            ..RewardBundle::default()
        };
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let bundle = RewardBundle {
            items: vec![item(vec![applied(1), applied(1)])],
            ..RewardBundle::default()
        };
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn filled_slots_are_accepted() {
        let bundle = RewardBundle {
            items: vec![item(vec![applied(0), applied(1), applied(2)])],
            experience: 10,
            ..RewardBundle::default()
        };
        assert!(bundle.validate().is_ok());
        assert!(!bundle.is_empty());
    }
}
