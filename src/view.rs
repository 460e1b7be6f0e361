//! Per-cache statistics views.
//!
//! A [`CacheStatisticsView`] owns no counters. It remembers which cache it
//! describes and derives everything else from the statistics tree at read
//! time, so tiers registered after the view was created still show up.
//!
//! ```text
//!   cache handle
//!     ├── Direct<cache::GetOutcome> "get"        ──► cache_hits / cache_misses
//!     ├── Direct<cache::PutOutcome> "put"        ──► cache_puts
//!     ├── Direct<cache::RemoveOutcome> "remove"  ──► cache_removals
//!     └── store
//!           ├── Translated<tier::*> [OnHeap]     ──► TierStatistics("OnHeap")
//!           └── PassThrough "mappings"           ──► TierStatistics::mappings
//! ```
//!
//! Evictions and expirations at cache level come from the lowest tier (the
//! smallest tier height), which is the one that actually drops entries.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::lifecycle::CacheHandle;
use crate::metrics::snapshot::{CacheStatisticsSnapshot, TierStatisticsSnapshot};
use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider};
use crate::outcome::{Outcome, cache, tier};
use crate::pass_through::PassThroughStatistic;
use crate::statistic::{OperationStatistic, SharedStatistic, ZeroStatistic, names};
use crate::tree::{
    LivenessCheck, NodeKey, StatisticOrigin, StatisticQuery, StatisticTreeRegistry,
};

// ---------------------------------------------------------------------------
// TierStatistics
// ---------------------------------------------------------------------------

/// Translated statistics of one tier of one cache.
#[derive(Clone)]
pub struct TierStatistics {
    pub(crate) tier: String,
    pub(crate) tier_height: i32,
    /// Store the translated statistics hang under.
    pub(crate) owner: NodeKey,
    // ties `owner` to the store it named when this value was built
    pub(crate) owner_alive: Option<LivenessCheck>,
    pub(crate) tree: Arc<StatisticTreeRegistry>,
    pub(crate) get: SharedStatistic<tier::GetOutcome>,
    pub(crate) put: SharedStatistic<tier::PutOutcome>,
    pub(crate) removal: SharedStatistic<tier::RemovalOutcome>,
    pub(crate) eviction: SharedStatistic<tier::EvictionOutcome>,
    pub(crate) expiration: SharedStatistic<tier::ExpirationOutcome>,
}

impl TierStatistics {
    fn empty(
        tier: &str,
        tier_height: i32,
        owner: NodeKey,
        owner_alive: Option<LivenessCheck>,
        tree: Arc<StatisticTreeRegistry>,
    ) -> Self {
        Self {
            tier: tier.to_owned(),
            tier_height,
            owner,
            owner_alive,
            tree,
            get: ZeroStatistic::shared(),
            put: ZeroStatistic::shared(),
            removal: ZeroStatistic::shared(),
            eviction: ZeroStatistic::shared(),
            expiration: ZeroStatistic::shared(),
        }
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn tier_height(&self) -> i32 {
        self.tier_height
    }

    pub fn owner(&self) -> NodeKey {
        self.owner
    }

    pub fn get_statistic(&self) -> &SharedStatistic<tier::GetOutcome> {
        &self.get
    }

    pub fn put_statistic(&self) -> &SharedStatistic<tier::PutOutcome> {
        &self.put
    }

    pub fn removal_statistic(&self) -> &SharedStatistic<tier::RemovalOutcome> {
        &self.removal
    }

    pub fn eviction_statistic(&self) -> &SharedStatistic<tier::EvictionOutcome> {
        &self.eviction
    }

    pub fn expiration_statistic(&self) -> &SharedStatistic<tier::ExpirationOutcome> {
        &self.expiration
    }

    pub fn hits(&self) -> u64 {
        self.get.count(tier::GetOutcome::Hit)
    }

    pub fn misses(&self) -> u64 {
        self.get.count(tier::GetOutcome::Miss)
    }

    pub fn puts(&self) -> u64 {
        self.put.count(tier::PutOutcome::Put)
    }

    pub fn removals(&self) -> u64 {
        self.removal.count(tier::RemovalOutcome::Removed)
    }

    pub fn evictions(&self) -> u64 {
        self.eviction.count(tier::EvictionOutcome::Success)
    }

    pub fn expirations(&self) -> u64 {
        self.expiration.count(tier::ExpirationOutcome::Success)
    }

    /// Entry count passed through by the owning store, if it exposes one.
    ///
    /// `None` once that store has been dropped, even if another node later
    /// reuses its address.
    pub fn mappings(&self) -> Option<u64> {
        if !self.owner_alive.as_ref().is_some_and(|alive| alive()) {
            return None;
        }
        let query = StatisticQuery::named(names::MAPPINGS).children_only();
        self.tree
            .find_statistics_under::<PassThroughStatistic<u64>>(self.owner, &query)
            .into_iter()
            .next()
            .map(|found| found.statistic.value())
    }

    pub fn snapshot(&self) -> TierStatisticsSnapshot {
        TierStatisticsSnapshot {
            tier_height: self.tier_height,
            hits: self.hits(),
            misses: self.misses(),
            puts: self.puts(),
            removals: self.removals(),
            evictions: self.evictions(),
            expirations: self.expirations(),
            mappings: self.mappings(),
        }
    }
}

impl fmt::Debug for TierStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierStatistics")
            .field("tier", &self.tier)
            .field("tier_height", &self.tier_height)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// CacheStatisticsView
// ---------------------------------------------------------------------------

/// Statistics of one cache alias, derived on demand from the tree.
pub struct CacheStatisticsView {
    alias: String,
    cache: Arc<dyn CacheHandle>,
    tree: Arc<StatisticTreeRegistry>,
    // raw counts at the last clear()
    baseline: Mutex<CacheStatisticsSnapshot>,
}

impl CacheStatisticsView {
    pub(crate) fn new(alias: impl Into<String>, cache: Arc<dyn CacheHandle>, tree: Arc<StatisticTreeRegistry>) -> Self {
        Self {
            alias: alias.into(),
            cache,
            tree,
            baseline: Mutex::new(CacheStatisticsSnapshot::default()),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn cache(&self) -> &Arc<dyn CacheHandle> {
        &self.cache
    }

    /// Tree node of the cache this view describes.
    pub fn cache_key(&self) -> NodeKey {
        NodeKey::of(&self.cache)
    }

    /// `true` when this view describes exactly `cache`.
    pub fn is_bound_to(&self, cache: &Arc<dyn CacheHandle>) -> bool {
        NodeKey::of(cache) == self.cache_key()
    }

    /// Direct statistic `name` registered right under the cache, or zero.
    pub fn operation_statistic<T: Outcome>(&self, name: &str) -> SharedStatistic<T> {
        let query = StatisticQuery::named(name)
            .origin(StatisticOrigin::Direct)
            .children_only();
        self.tree
            .find_statistics_under::<SharedStatistic<T>>(self.cache_key(), &query)
            .into_iter()
            .next()
            .map_or_else(ZeroStatistic::shared, |found| Arc::clone(&*found.statistic))
    }

    /// Every tier found below the cache, keyed by tier tag.
    ///
    /// A tier appears as soon as any of its translated statistics exists;
    /// the ones it lacks read as zero.
    pub fn tier_statistics(&self) -> BTreeMap<String, TierStatistics> {
        let mut tiers = BTreeMap::new();
        self.collect_tier_statistic::<tier::GetOutcome>(&mut tiers, names::GET, |t, s| t.get = s);
        self.collect_tier_statistic::<tier::PutOutcome>(&mut tiers, names::PUT, |t, s| t.put = s);
        self.collect_tier_statistic::<tier::RemovalOutcome>(&mut tiers, names::REMOVE, |t, s| {
            t.removal = s
        });
        self.collect_tier_statistic::<tier::EvictionOutcome>(&mut tiers, names::EVICTION, |t, s| {
            t.eviction = s
        });
        self.collect_tier_statistic::<tier::ExpirationOutcome>(
            &mut tiers,
            names::EXPIRATION,
            |t, s| t.expiration = s,
        );
        tiers
    }

    fn collect_tier_statistic<T: Outcome>(
        &self,
        tiers: &mut BTreeMap<String, TierStatistics>,
        name: &str,
        assign: impl Fn(&mut TierStatistics, SharedStatistic<T>),
    ) {
        let query = StatisticQuery::named(name).origin(StatisticOrigin::Translated);
        let found = self
            .tree
            .find_statistics_under::<SharedStatistic<T>>(self.cache_key(), &query);
        for discovered in found {
            let Some(tag) = discovered.descriptor.tags.first() else {
                continue;
            };
            let height = discovered.descriptor.tier_height.unwrap_or_default();
            let statistic = Arc::clone(&*discovered.statistic);
            match tiers.entry(tag.clone()) {
                Entry::Vacant(slot) => {
                    let mut tier = TierStatistics::empty(
                        tag,
                        height,
                        discovered.owner,
                        self.tree.liveness_of(discovered.owner),
                        Arc::clone(&self.tree),
                    );
                    assign(&mut tier, statistic);
                    slot.insert(tier);
                },
                // nearest registration wins
                Entry::Occupied(mut slot) => {
                    if slot.get().owner == discovered.owner {
                        assign(slot.get_mut(), statistic);
                    }
                },
            }
        }
    }

    /// Tier with the smallest height, the one entries finally leave from.
    fn authoritative_tier(tiers: &BTreeMap<String, TierStatistics>) -> Option<&TierStatistics> {
        tiers.values().min_by_key(|tier| tier.tier_height)
    }

    fn raw_snapshot(&self) -> CacheStatisticsSnapshot {
        let get = self.operation_statistic::<cache::GetOutcome>(names::GET);
        let put = self.operation_statistic::<cache::PutOutcome>(names::PUT);
        let remove = self.operation_statistic::<cache::RemoveOutcome>(names::REMOVE);

        let hits = get.count(cache::GetOutcome::Hit);
        let misses = get.count(cache::GetOutcome::Miss);
        let tiers = self.tier_statistics();
        let lowest = Self::authoritative_tier(&tiers);

        CacheStatisticsSnapshot {
            cache_gets: hits + misses,
            cache_hits: hits,
            cache_misses: misses,
            cache_puts: put.count(cache::PutOutcome::Put),
            cache_removals: remove.count(cache::RemoveOutcome::Success),
            cache_evictions: lowest.map_or(0, TierStatistics::evictions),
            cache_expirations: lowest.map_or(0, TierStatistics::expirations),
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.snapshot().cache_hits
    }

    pub fn cache_misses(&self) -> u64 {
        self.snapshot().cache_misses
    }

    pub fn cache_gets(&self) -> u64 {
        self.snapshot().cache_gets
    }

    pub fn cache_puts(&self) -> u64 {
        self.snapshot().cache_puts
    }

    pub fn cache_removals(&self) -> u64 {
        self.snapshot().cache_removals
    }

    pub fn cache_evictions(&self) -> u64 {
        self.snapshot().cache_evictions
    }

    pub fn cache_expirations(&self) -> u64 {
        self.snapshot().cache_expirations
    }

    pub fn cache_hit_percentage(&self) -> f64 {
        self.snapshot().hit_percentage()
    }

    pub fn cache_miss_percentage(&self) -> f64 {
        self.snapshot().miss_percentage()
    }

    /// Snapshots of every tier, keyed by tier tag.
    pub fn tier_snapshots(&self) -> BTreeMap<String, TierStatisticsSnapshot> {
        self.tier_statistics()
            .into_iter()
            .map(|(tag, tier)| (tag, tier.snapshot()))
            .collect()
    }

    /// Restarts cache-level counts from zero.
    ///
    /// Recorded counters are left alone; later snapshots subtract the counts
    /// seen here. Tier statistics are not affected.
    pub fn clear(&self) {
        let raw = self.raw_snapshot();
        *self.baseline.lock() = raw;
        log::debug!("cleared statistics of cache '{}'", self.alias);
    }
}

impl MetricsSnapshotProvider<CacheStatisticsSnapshot> for CacheStatisticsView {
    fn snapshot(&self) -> CacheStatisticsSnapshot {
        let raw = self.raw_snapshot();
        raw.since(&self.baseline.lock())
    }
}

impl MetricsReset for CacheStatisticsView {
    fn reset_metrics(&self) {
        self.clear();
    }
}

impl fmt::Debug for CacheStatisticsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStatisticsView")
            .field("alias", &self.alias)
            .field("cache", &self.cache_key())
            .finish_non_exhaustive()
    }
}
