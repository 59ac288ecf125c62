//! Economy configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the economy components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Level used for enemy selection and loot rolls on the instant-loot path.
    #[serde(default = "default_instant_loot_level")]
    pub instant_loot_level: u32,
}

const fn default_instant_loot_level() -> u32 {
    1
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            instant_loot_level: default_instant_loot_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: EconomyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.instant_loot_level, 1);
        assert_eq!(EconomyConfig::default().instant_loot_level, 1);
    }
}
