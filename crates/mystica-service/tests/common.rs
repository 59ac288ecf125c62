//! Common test utilities for mystica integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::json;

use mystica_core::{
    EnemyTypeId, ItemTypeId, LocationId, MaterialId, Rarity, StyleId, UserId,
};
use mystica_economy::catalog::{EnemyEntry, ItemDrop, MaterialDrop, RollRange};
use mystica_economy::{Catalog, CatalogFile, EconomyConfig, LocationEntry, LootTable};
use mystica_service::{create_router, AppState, ServiceConfig};
use mystica_store::{MemoryStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for direct assertions.
    pub store: Arc<MemoryStore>,
    /// A test user.
    pub test_user_id: UserId,
    /// The single location in the test catalog.
    pub location_id: LocationId,
}

impl TestHarness {
    /// Create a new test harness with a fresh store and catalog.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let location_id = LocationId::generate();
        let catalog = Catalog::from_json_str(
            &serde_json::to_string(&test_catalog(location_id)).expect("serialize catalog"),
        )
        .expect("Failed to build catalog");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: String::new(),
            catalog_path: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            economy: EconomyConfig {
                instant_loot_level: 2,
            },
        };

        let state = AppState::new(store.clone(), Arc::new(catalog), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: UserId::generate(),
            location_id,
        }
    }

    /// Path prefix for the test user.
    pub fn user_path(&self, rest: &str) -> String {
        format!("/v1/users/{}{rest}", self.test_user_id)
    }

    /// Credit the test user through the API.
    pub async fn credit(&self, currency: &str, amount: i64) {
        self.server
            .post(&self.user_path("/credits"))
            .json(&json!({
                "currency": currency,
                "amount": amount,
                "source": "admin"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    /// Current balance straight from the store.
    pub fn balance(&self, currency: mystica_core::CurrencyKind) -> i64 {
        self.store
            .get_balance(&self.test_user_id, currency)
            .expect("read balance")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-location catalog whose rolls are fully determined except for which
/// of two identical-valued enemies is picked.
fn test_catalog(location_id: LocationId) -> CatalogFile {
    let style_id = StyleId::generate();
    CatalogFile {
        locations: vec![LocationEntry {
            id: location_id,
            name: "Campus Library".into(),
            location_type: "library".into(),
            enemies: vec![
                EnemyEntry {
                    enemy_type_id: EnemyTypeId::generate(),
                    style_id,
                    weight: 70,
                    min_level: 1,
                    max_level: None,
                },
                EnemyEntry {
                    enemy_type_id: EnemyTypeId::generate(),
                    style_id,
                    weight: 30,
                    min_level: 1,
                    max_level: None,
                },
            ],
            loot: LootTable {
                gold: RollRange { min: 10, max: 10 },
                gem_chance: 0.0,
                gems: RollRange::default(),
                material_rolls: 1,
                materials: vec![MaterialDrop {
                    material_id: MaterialId::generate(),
                    style_id,
                    weight: 1,
                    quantity: RollRange { min: 2, max: 2 },
                }],
                item_chance: 1.0,
                items: vec![ItemDrop {
                    item_type_id: ItemTypeId::generate(),
                    name: "Bookmark Dagger".into(),
                    rarity: Rarity::Common,
                    style_id,
                    weight: 1,
                }],
                experience: RollRange { min: 5, max: 5 },
            },
        }],
    }
}
