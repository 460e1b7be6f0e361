//! Configuration and construction of the statistics service.
//!
//! ## Example
//!
//! ```rust
//! use tierstats::builder::StatisticsServiceBuilder;
//!
//! let manager = StatisticsServiceBuilder::new()
//!     .tree_shards(32)
//!     .shard_seed(7)
//!     .build();
//! assert_eq!(manager.tree().shard_count(), 32);
//!
//! assert!(StatisticsServiceBuilder::new().tree_shards(0).try_build().is_err());
//! ```

use std::sync::Arc;

use crate::error::ConfigError;
use crate::lifecycle::CacheLifecycleManager;

/// Default number of lock shards in the statistics tree.
pub const DEFAULT_TREE_SHARDS: usize = 16;

/// Tunables of the statistics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsConfig {
    /// Lock shards in the statistics tree. More shards, less contention
    /// between stores registering at the same time.
    pub tree_shards: usize,
    /// Seed for the node-to-shard hash.
    pub shard_seed: u64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            tree_shards: DEFAULT_TREE_SHARDS,
            shard_seed: 0,
        }
    }
}

impl StatisticsConfig {
    /// Checks the configuration without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_shards == 0 {
            return Err(ConfigError::new("tree_shards must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for [`CacheLifecycleManager`].
#[derive(Debug, Clone, Default)]
pub struct StatisticsServiceBuilder {
    config: StatisticsConfig,
}

impl StatisticsServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: StatisticsConfig) -> Self {
        Self { config }
    }

    pub fn tree_shards(mut self, shards: usize) -> Self {
        self.config.tree_shards = shards;
        self
    }

    pub fn shard_seed(mut self, seed: u64) -> Self {
        self.config.shard_seed = seed;
        self
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Builds the manager, clamping `tree_shards` to at least 1.
    pub fn build(self) -> Arc<CacheLifecycleManager> {
        let config = StatisticsConfig {
            tree_shards: self.config.tree_shards.max(1),
            ..self.config
        };
        CacheLifecycleManager::with_config(config)
    }

    /// Builds the manager, rejecting an invalid configuration.
    pub fn try_build(self) -> Result<Arc<CacheLifecycleManager>, ConfigError> {
        self.config.validate()?;
        Ok(CacheLifecycleManager::with_config(self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StatisticsConfig::default();
        assert_eq!(config.tree_shards, DEFAULT_TREE_SHARDS);
        assert_eq!(config.shard_seed, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn build_clamps_zero_shards() {
        let manager = StatisticsServiceBuilder::new().tree_shards(0).build();
        assert_eq!(manager.tree().shard_count(), 1);
        assert_eq!(manager.config().tree_shards, 1);
    }

    #[test]
    fn try_build_rejects_zero_shards() {
        let err = StatisticsServiceBuilder::new()
            .tree_shards(0)
            .try_build()
            .unwrap_err();
        assert!(err.message().contains("tree_shards"));
    }

    #[test]
    fn try_build_applies_config() {
        let manager = StatisticsServiceBuilder::from_config(StatisticsConfig {
            tree_shards: 4,
            shard_seed: 99,
        })
        .try_build()
        .unwrap();
        assert_eq!(manager.tree().shard_count(), 4);
        assert_eq!(manager.config().shard_seed, 99);
    }
}
