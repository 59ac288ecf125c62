//! Application state.

use std::sync::Arc;

use mystica_economy::{
    AffordabilityChecker, Catalog, Ledger, LootOrchestrator, RewardEngine,
};
use mystica_store::Store;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Currency ledger.
    pub ledger: Ledger,

    /// Balance comparisons.
    pub affordability: AffordabilityChecker,

    /// Reward application.
    pub rewards: RewardEngine,

    /// Instant loot.
    pub loot: Arc<LootOrchestrator>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Wire the economy components over `store`, with `catalog` serving
    /// location lookup, enemy selection and loot generation.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, catalog: Arc<Catalog>, config: ServiceConfig) -> Self {
        if catalog.is_empty() {
            tracing::warn!("Catalog has no locations - instant loot will always return not found");
        }

        let ledger = Ledger::new(Arc::clone(&store));
        let affordability = AffordabilityChecker::new(ledger.clone());
        let rewards = RewardEngine::new(store);
        let loot = Arc::new(LootOrchestrator::new(
            catalog.clone(),
            catalog.clone(),
            catalog,
            rewards.clone(),
            config.economy.clone(),
        ));

        Self {
            ledger,
            affordability,
            rewards,
            loot,
            config,
        }
    }
}
