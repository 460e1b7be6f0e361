//! Deterministic key-to-shard mapping.
//!
//! Used by [`StatisticTreeRegistry`](crate::tree::StatisticTreeRegistry) to
//! spread node entries over independently locked shards.
//!
//! ## Architecture
//!
//! ```text
//!   NodeKey ──► SipHash(seed, key) % shards ──► shard index
//!
//!   ┌─────────┬─────────┬─────────┬─────────┐
//!   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │
//!   └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! Node keys are allocation addresses, so their low bits are mostly zero;
//! a full hash (not a modulo of the raw key) keeps shards evenly used.
//!
//! ## Example Usage
//!
//! ```
//! use tierstats::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(4, 0);
//! let shard = selector.shard_for_key(&"cache:users");
//! assert!(shard < 4);
//! assert_eq!(selector.shard_for_key(&"cache:users"), shard);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic shard selector using a seeded hash.
///
/// The same `(key, seed, shards)` tuple always produces the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards; zero is clamped to one.
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            seed,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Maps `key` to a shard index in `[0, shards)`.
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        if self.shards == 1 {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() % self.shards as u64) as usize
    }
}

impl Default for ShardSelector {
    /// Single shard, seed 0.
    fn default() -> Self {
        Self::new(1, 0)
    }
}
