use std::collections::BTreeMap;

/// Cache-level counts, as seen by a statistics reader.
///
/// Counts are relative to the last [`clear`](crate::view::CacheStatisticsView::clear)
/// of the view that produced them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatisticsSnapshot {
    pub cache_gets: u64, // hits + misses
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_puts: u64,
    pub cache_removals: u64,

    // taken from the authoritative (lowest) tier
    pub cache_evictions: u64,
    pub cache_expirations: u64,
}

impl CacheStatisticsSnapshot {
    /// Hits as a percentage of gets; `0.0` before the first get.
    pub fn hit_percentage(&self) -> f64 {
        percentage(self.cache_hits, self.cache_gets)
    }

    /// Misses as a percentage of gets; `0.0` before the first get.
    pub fn miss_percentage(&self) -> f64 {
        percentage(self.cache_misses, self.cache_gets)
    }

    /// Field-wise `self - baseline`, floored at zero.
    pub fn since(&self, baseline: &Self) -> Self {
        Self {
            cache_gets: self.cache_gets.saturating_sub(baseline.cache_gets),
            cache_hits: self.cache_hits.saturating_sub(baseline.cache_hits),
            cache_misses: self.cache_misses.saturating_sub(baseline.cache_misses),
            cache_puts: self.cache_puts.saturating_sub(baseline.cache_puts),
            cache_removals: self.cache_removals.saturating_sub(baseline.cache_removals),
            cache_evictions: self.cache_evictions.saturating_sub(baseline.cache_evictions),
            cache_expirations: self
                .cache_expirations
                .saturating_sub(baseline.cache_expirations),
        }
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Counts of one tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TierStatisticsSnapshot {
    pub tier_height: i32,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub removals: u64,
    pub evictions: u64,
    pub expirations: u64,

    // gauge, present only when the owning store passes it through
    pub mappings: Option<u64>,
}

/// Everything known about one cache at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheReport {
    pub alias: String,
    pub cache: CacheStatisticsSnapshot,
    /// Keyed by tier tag.
    pub tiers: BTreeMap<String, TierStatisticsSnapshot>,
}

/// Snapshot of every cache known to the lifecycle manager, ordered by alias.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatisticsReport {
    pub caches: Vec<CacheReport>,
}

impl StatisticsReport {
    pub fn cache(&self, alias: &str) -> Option<&CacheReport> {
        self.caches.iter().find(|report| report.alias == alias)
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_are_zero_without_gets() {
        let snapshot = CacheStatisticsSnapshot::default();
        assert_eq!(snapshot.hit_percentage(), 0.0);
        assert_eq!(snapshot.miss_percentage(), 0.0);
    }

    #[test]
    fn percentages_split_gets() {
        let snapshot = CacheStatisticsSnapshot {
            cache_gets: 4,
            cache_hits: 3,
            cache_misses: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.hit_percentage(), 75.0);
        assert_eq!(snapshot.miss_percentage(), 25.0);
    }

    #[test]
    fn since_saturates() {
        let now = CacheStatisticsSnapshot {
            cache_puts: 5,
            cache_evictions: 1,
            ..Default::default()
        };
        let baseline = CacheStatisticsSnapshot {
            cache_puts: 2,
            cache_evictions: 3,
            ..Default::default()
        };
        let delta = now.since(&baseline);
        assert_eq!(delta.cache_puts, 3);
        assert_eq!(delta.cache_evictions, 0);
    }
}
