//! JSON-backed location, enemy and loot catalog.
//!
//! A [`Catalog`] implements the three read-side collaborators
//! ([`LocationLookup`], [`EnemySelector`], [`LootGenerator`]) from a single
//! static file:
//!
//! ```json
//! {
//!   "locations": [{
//!     "id": "7a1f...",
//!     "name": "Campus Library",
//!     "location_type": "library",
//!     "enemies": [
//!       { "enemy_type_id": "3c2e...", "style_id": "9b0d...", "weight": 70 },
//!       { "enemy_type_id": "55aa...", "style_id": "9b0d...", "weight": 30, "min_level": 5 }
//!     ],
//!     "loot": {
//!       "gold": { "min": 5, "max": 15 },
//!       "gem_chance": 0.1,
//!       "gems": { "min": 1, "max": 2 },
//!       "material_rolls": 1,
//!       "materials": [{ "material_id": "...", "style_id": "...", "weight": 1, "quantity": { "min": 1, "max": 3 } }],
//!       "item_chance": 0.25,
//!       "items": [{ "item_type_id": "...", "name": "Bookmark Dagger", "rarity": "common", "style_id": "...", "weight": 1 }],
//!       "experience": { "min": 10, "max": 20 }
//!     }
//!   }]
//! }
//! ```
//!
//! Gold and experience rolls are multiplied by the level.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use mystica_core::{
    CurrencyKind, EconomyError, EnemyTypeId, ItemGrant, ItemTypeId, LocationId, MaterialGrant,
    MaterialId, Rarity, Result, RewardBundle, SourceKind, StyleId,
};

use crate::collaborators::{EnemySelector, Location, LocationLookup, LootGenerator, SelectedEnemy};

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRange {
    /// Lower bound.
    pub min: i64,
    /// Upper bound.
    pub max: i64,
}

impl RollRange {
    fn roll(self, rng: &mut impl Rng) -> i64 {
        rng.gen_range(self.min..=self.max)
    }

    fn check(self, what: &str) -> Result<()> {
        if self.min < 0 || self.min > self.max {
            return Err(EconomyError::validation(format!(
                "{what} range {}..={} is invalid",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// An enemy that can appear at a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyEntry {
    /// Enemy type.
    pub enemy_type_id: EnemyTypeId,
    /// Style variant.
    pub style_id: StyleId,
    /// Relative spawn weight.
    pub weight: u32,
    /// Lowest level it appears at.
    #[serde(default = "default_min_level")]
    pub min_level: u32,
    /// Highest level it appears at, unbounded if absent.
    #[serde(default)]
    pub max_level: Option<u32>,
}

const fn default_min_level() -> u32 {
    1
}

impl EnemyEntry {
    fn spawns_at(&self, level: u32) -> bool {
        level >= self.min_level && self.max_level.map_or(true, |max| level <= max)
    }
}

/// A material that can drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDrop {
    /// The material.
    pub material_id: MaterialId,
    /// Style variant.
    pub style_id: StyleId,
    /// Relative drop weight.
    pub weight: u32,
    /// Stack size.
    pub quantity: RollRange,
}

/// An item that can drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDrop {
    /// Item template.
    pub item_type_id: ItemTypeId,
    /// Provisional name.
    pub name: String,
    /// Rarity.
    pub rarity: Rarity,
    /// Style variant.
    pub style_id: StyleId,
    /// Relative drop weight.
    pub weight: u32,
}

/// What a location's enemies drop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LootTable {
    /// Gold per level.
    #[serde(default)]
    pub gold: RollRange,
    /// Probability of dropping gems.
    #[serde(default)]
    pub gem_chance: f64,
    /// Gems when they drop.
    #[serde(default)]
    pub gems: RollRange,
    /// Number of material draws.
    #[serde(default)]
    pub material_rolls: u32,
    /// Material pool.
    #[serde(default)]
    pub materials: Vec<MaterialDrop>,
    /// Probability of dropping an item.
    #[serde(default)]
    pub item_chance: f64,
    /// Item pool.
    #[serde(default)]
    pub items: Vec<ItemDrop>,
    /// Experience per level.
    #[serde(default)]
    pub experience: RollRange,
}

/// One location with its enemy pool and loot table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationEntry {
    /// Location identifier.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Category.
    pub location_type: String,
    /// Weighted enemy pool.
    pub enemies: Vec<EnemyEntry>,
    /// Loot table.
    #[serde(default)]
    pub loot: LootTable,
}

/// On-disk catalog layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// All locations.
    pub locations: Vec<LocationEntry>,
}

/// Static game data with a shared random source.
pub struct Catalog {
    locations: BTreeMap<LocationId, LocationEntry>,
    rng: Mutex<StdRng>,
}

impl Catalog {
    /// Build a catalog using `rng` for every roll.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Validation` for duplicate locations, empty enemy
    /// pools, zero weights, inverted ranges or chances outside `0..=1`.
    pub fn new(file: CatalogFile, rng: StdRng) -> Result<Self> {
        let mut locations = BTreeMap::new();
        for entry in file.locations {
            validate_location(&entry)?;
            let id = entry.id;
            if locations.insert(id, entry).is_some() {
                return Err(EconomyError::validation(format!(
                    "location {id} is defined twice"
                )));
            }
        }
        Ok(Self {
            locations,
            rng: Mutex::new(rng),
        })
    }

    /// A catalog with no locations. Every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            locations: BTreeMap::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Parse a catalog from JSON text, seeded from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Validation` if the JSON is malformed or fails
    /// [`Catalog::new`] checks.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| EconomyError::validation(format!("invalid catalog: {e}")))?;
        Self::new(file, StdRng::from_entropy())
    }

    /// Read a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the file cannot be read, and the
    /// errors of [`Catalog::from_json_str`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            EconomyError::Persistence(format!("failed to read catalog {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            locations = catalog.locations.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the catalog has no locations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    fn location(&self, location_id: &LocationId) -> Result<&LocationEntry> {
        self.locations
            .get(location_id)
            .ok_or_else(|| EconomyError::not_found("location", location_id))
    }
}

#[async_trait]
impl LocationLookup for Catalog {
    async fn get_by_id(&self, location_id: &LocationId) -> Result<Option<Location>> {
        Ok(self.locations.get(location_id).map(|entry| Location {
            id: entry.id,
            name: entry.name.clone(),
            location_type: entry.location_type.clone(),
        }))
    }
}

#[async_trait]
impl EnemySelector for Catalog {
    async fn select_enemy(&self, location_id: &LocationId, level: u32) -> Result<SelectedEnemy> {
        let entry = self.location(location_id)?;
        pick_enemy(entry, level, &mut *self.rng.lock())
    }
}

#[async_trait]
impl LootGenerator for Catalog {
    async fn generate_loot(
        &self,
        location_id: &LocationId,
        level: u32,
        enemy_id: &EnemyTypeId,
        _enemy_style_id: &StyleId,
    ) -> Result<RewardBundle> {
        let entry = self.location(location_id)?;
        let bundle = roll_loot(&entry.loot, level, &mut *self.rng.lock())?;
        tracing::debug!(
            location_id = %location_id,
            enemy_id = %enemy_id,
            level,
            items = bundle.items.len(),
            materials = bundle.materials.len(),
            "Loot rolled"
        );
        Ok(bundle)
    }
}

/// Pick a weighted-random enemy that spawns at `level`.
///
/// # Errors
///
/// Returns `EconomyError::NotFound` if no enemy at the location spawns at
/// `level`.
pub fn pick_enemy(entry: &LocationEntry, level: u32, rng: &mut impl Rng) -> Result<SelectedEnemy> {
    let pool: Vec<&EnemyEntry> = entry.enemies.iter().filter(|e| e.spawns_at(level)).collect();
    if pool.is_empty() {
        return Err(EconomyError::not_found(
            "enemy",
            format!("location {} at level {level}", entry.id),
        ));
    }
    let index = weighted(pool.iter().map(|e| e.weight))?.sample(rng);
    let enemy = pool[index];
    Ok(SelectedEnemy {
        id: enemy.enemy_type_id,
        style_id: enemy.style_id,
    })
}

/// Roll one bundle from `table`.
///
/// # Errors
///
/// Returns `EconomyError::Validation` if a level-scaled amount overflows.
pub fn roll_loot(table: &LootTable, level: u32, rng: &mut impl Rng) -> Result<RewardBundle> {
    let mut bundle = RewardBundle {
        source: SourceKind::CombatVictory,
        ..RewardBundle::default()
    };

    let gold = scaled(table.gold.roll(rng), level, "gold")?;
    if gold > 0 {
        bundle.currencies.insert(CurrencyKind::Gold, gold);
    }
    if table.gem_chance > 0.0 && rng.gen_bool(table.gem_chance) {
        let gems = table.gems.roll(rng);
        if gems > 0 {
            bundle.currencies.insert(CurrencyKind::Gems, gems);
        }
    }

    if !table.materials.is_empty() {
        let index = weighted(table.materials.iter().map(|m| m.weight))?;
        for _ in 0..table.material_rolls {
            let drop = &table.materials[index.sample(rng)];
            let quantity = drop.quantity.roll(rng);
            if quantity > 0 {
                bundle.materials.push(MaterialGrant {
                    material_id: drop.material_id,
                    style_id: drop.style_id,
                    quantity,
                });
            }
        }
    }

    if !table.items.is_empty() && table.item_chance > 0.0 && rng.gen_bool(table.item_chance) {
        let index = weighted(table.items.iter().map(|i| i.weight))?;
        let drop = &table.items[index.sample(rng)];
        bundle.items.push(ItemGrant {
            item_type_id: drop.item_type_id,
            name: drop.name.clone(),
            rarity: drop.rarity,
            style_id: drop.style_id,
            applied_materials: Vec::new(),
        });
    }

    let experience = scaled(table.experience.roll(rng), level, "experience")?;
    bundle.experience = u64::try_from(experience).unwrap_or(0);

    Ok(bundle)
}

fn scaled(amount: i64, level: u32, what: &str) -> Result<i64> {
    amount
        .checked_mul(i64::from(level))
        .ok_or_else(|| EconomyError::validation(format!("{what} overflows at level {level}")))
}

fn weighted(weights: impl IntoIterator<Item = u32>) -> Result<WeightedIndex<u32>> {
    WeightedIndex::new(weights)
        .map_err(|e| EconomyError::validation(format!("invalid weights: {e}")))
}

fn validate_location(entry: &LocationEntry) -> Result<()> {
    let id = entry.id;
    if entry.enemies.is_empty() {
        return Err(EconomyError::validation(format!(
            "location {id} has no enemies"
        )));
    }
    if entry.enemies.iter().any(|e| e.weight == 0)
        || entry.loot.materials.iter().any(|m| m.weight == 0)
        || entry.loot.items.iter().any(|i| i.weight == 0)
    {
        return Err(EconomyError::validation(format!(
            "location {id} has a zero weight"
        )));
    }

    let loot = &entry.loot;
    for (what, chance) in [("gem", loot.gem_chance), ("item", loot.item_chance)] {
        if !(0.0..=1.0).contains(&chance) {
            return Err(EconomyError::validation(format!(
                "location {id} {what} chance {chance} is outside 0..=1"
            )));
        }
    }
    loot.gold.check("gold")?;
    loot.gems.check("gems")?;
    loot.experience.check("experience")?;
    for material in &loot.materials {
        material.quantity.check("material quantity")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy(weight: u32, min_level: u32, max_level: Option<u32>) -> EnemyEntry {
        EnemyEntry {
            enemy_type_id: EnemyTypeId::generate(),
            style_id: StyleId::generate(),
            weight,
            min_level,
            max_level,
        }
    }

    fn entry() -> LocationEntry {
        LocationEntry {
            id: LocationId::generate(),
            name: "Downtown Gym".into(),
            location_type: "gym".into(),
            enemies: vec![enemy(1, 1, Some(4)), enemy(1, 5, None)],
            loot: LootTable {
                gold: RollRange { min: 5, max: 10 },
                gem_chance: 1.0,
                gems: RollRange { min: 1, max: 1 },
                material_rolls: 2,
                materials: vec![MaterialDrop {
                    material_id: MaterialId::generate(),
                    style_id: StyleId::generate(),
                    weight: 3,
                    quantity: RollRange { min: 1, max: 2 },
                }],
                item_chance: 1.0,
                items: vec![ItemDrop {
                    item_type_id: ItemTypeId::generate(),
                    name: "Kettlebell Flail".into(),
                    rarity: Rarity::Epic,
                    style_id: StyleId::generate(),
                    weight: 1,
                }],
                experience: RollRange { min: 10, max: 10 },
            },
        }
    }

    #[test]
    fn enemy_selection_respects_level_bands() {
        let entry = entry();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let low = pick_enemy(&entry, 1, &mut rng).unwrap();
            assert_eq!(low.id, entry.enemies[0].enemy_type_id);
            let high = pick_enemy(&entry, 9, &mut rng).unwrap();
            assert_eq!(high.id, entry.enemies[1].enemy_type_id);
        }
    }

    #[test]
    fn no_enemy_at_level_is_not_found() {
        let mut entry = entry();
        entry.enemies.truncate(1);
        let err = pick_enemy(&entry, 10, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { entity: "enemy", .. }));
    }

    #[test]
    fn rolls_stay_within_table_and_scale_with_level() {
        let entry = entry();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let bundle = roll_loot(&entry.loot, 3, &mut rng).unwrap();
            let gold = bundle.currencies[&CurrencyKind::Gold];
            assert!((15..=30).contains(&gold));
            assert_eq!(bundle.currencies[&CurrencyKind::Gems], 1);
            assert_eq!(bundle.materials.len(), 2);
            assert!(bundle.materials.iter().all(|m| (1..=2).contains(&m.quantity)));
            assert_eq!(bundle.items.len(), 1);
            assert_eq!(bundle.items[0].rarity, Rarity::Epic);
            assert_eq!(bundle.experience, 30);
            assert!(bundle.validate().is_ok());
        }
    }

    #[test]
    fn zero_chances_never_drop() {
        let mut entry = entry();
        entry.loot.gem_chance = 0.0;
        entry.loot.item_chance = 0.0;
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..20 {
            let bundle = roll_loot(&entry.loot, 1, &mut rng).unwrap();
            assert!(!bundle.currencies.contains_key(&CurrencyKind::Gems));
            assert!(bundle.items.is_empty());
        }
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let mut inverted = entry();
        inverted.loot.gold = RollRange { min: 10, max: 1 };
        let mut chance = entry();
        chance.loot.item_chance = 1.5;
        let mut empty = entry();
        empty.enemies.clear();
        let mut zero = entry();
        zero.enemies[0].weight = 0;

        for bad in [inverted, chance, empty, zero] {
            let file = CatalogFile {
                locations: vec![bad],
            };
            let result = Catalog::new(file, StdRng::seed_from_u64(0));
            assert!(matches!(result, Err(EconomyError::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn parses_json_and_serves_collaborators() {
        let entry = entry();
        let json = serde_json::to_string(&CatalogFile {
            locations: vec![entry.clone()],
        })
        .unwrap();
        let catalog = Catalog::from_json_str(&json).unwrap();
        assert_eq!(catalog.len(), 1);

        let location = catalog.get_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(location.name, "Downtown Gym");
        assert!(catalog
            .get_by_id(&LocationId::generate())
            .await
            .unwrap()
            .is_none());

        let enemy = catalog.select_enemy(&entry.id, 1).await.unwrap();
        let bundle = catalog
            .generate_loot(&entry.id, 1, &enemy.id, &enemy.style_id)
            .await
            .unwrap();
        assert_eq!(bundle.source, SourceKind::CombatVictory);
        assert!(!bundle.is_empty());
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        assert!(matches!(
            Catalog::from_json_str("{ \"locations\": 5 }"),
            Err(EconomyError::Validation { .. })
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let json = serde_json::to_string(&CatalogFile {
            locations: vec![entry()],
        })
        .unwrap();
        std::fs::write(&path, json).unwrap();

        assert_eq!(Catalog::load(&path).unwrap().len(), 1);
        assert!(matches!(
            Catalog::load(dir.path().join("missing.json")),
            Err(EconomyError::Persistence(_))
        ));
    }
}
