//! Engine configuration.
//!
//! Hosts configure the engine at startup by providing an [`EngineConfig`].
//! Content (events, items, statuses, attributes, variables) is loaded
//! separately; the config only carries engine-wide knobs.

use serde::{Deserialize, Serialize};

/// Engine-wide configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Seed string for the default random source.
    pub seed: String,

    /// Upper cap on any inventory stack. Items may declare a lower cap.
    pub max_item_stack: u32,

    /// Priority used by `TriggerEvents` entries that omit one.
    pub default_trigger_priority: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: String::from("default"),
            max_item_stack: u32::MAX,
            default_trigger_priority: 0,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default knobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the RNG seed (builder pattern).
    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Set the inventory stack cap (builder pattern).
    #[must_use]
    pub fn with_max_item_stack(mut self, max: u32) -> Self {
        self.max_item_stack = max;
        self
    }

    /// Set the default trigger priority (builder pattern).
    #[must_use]
    pub fn with_default_trigger_priority(mut self, priority: i32) -> Self {
        self.default_trigger_priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_seed("run-1")
            .with_max_item_stack(99)
            .with_default_trigger_priority(100);

        assert_eq!(config.seed, "run-1");
        assert_eq!(config.max_item_stack, 99);
        assert_eq!(config.default_trigger_priority, 100);
    }

    #[test]
    fn test_config_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"maxItemStack": 5}"#).unwrap();
        assert_eq!(config.max_item_stack, 5);
        assert_eq!(config.seed, "default");
    }
}
