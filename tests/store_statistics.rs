// ==============================================
// STORE STATISTIC WIRING TESTS (integration)
// ==============================================
//
// How a store implementation wires its counters into the statistics service:
// observers at construction, translated per-tier statistics, pass-through
// gauges, and teardown through clean.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tierstats::lifecycle::{CacheHandle, CacheLifecycleManager};
use tierstats::observer::OperationObserver;
use tierstats::outcome::{Outcome, store, tier};
use tierstats::pass_through::StatisticType;
use tierstats::statistic::{OperationStatistic, TranslationTable};

// ==============================================
// A minimal on-heap store
// ==============================================

struct OnHeapStore {
    // statistics context; the store's counters and gauges hang under it
    node: Arc<AtomicU64>,
    get: OperationObserver<store::GetOutcome>,
    put: OperationObserver<store::PutOutcome>,
}

impl OnHeapStore {
    fn new(manager: &CacheLifecycleManager, cache: &Arc<TestCache>) -> Self {
        let node = Arc::new(AtomicU64::new(0));
        manager.associate(&node, cache);
        Self {
            get: manager.create_operation_observer("get", "OnHeap", &node),
            put: manager.create_operation_observer("put", "OnHeap", &node),
            node,
        }
    }

    fn len(&self) -> u64 {
        self.node.load(Ordering::Relaxed)
    }

    fn get(&self, present: bool) {
        self.get.record(if present {
            store::GetOutcome::Hit
        } else {
            store::GetOutcome::Miss
        });
    }

    fn put(&self) {
        self.node.fetch_add(1, Ordering::Relaxed);
        self.put.record(store::PutOutcome::Put);
    }
}

struct TestCache;
impl CacheHandle for TestCache {}

// ==============================================
// Tier registration
// ==============================================

mod tiers {
    use super::*;

    #[test]
    fn store_counters_surface_as_tier_statistics() {
        let manager = CacheLifecycleManager::new();
        let cache = Arc::new(TestCache);
        manager.cache_added("users", cache.clone());

        let heap = Arc::new("heap");
        manager.associate(&heap, &cache);
        let get = manager.create_operation_observer::<store::GetOutcome, _>("get", "OnHeap", &heap);
        let put = manager.create_operation_observer::<store::PutOutcome, _>("put", "OnHeap", &heap);
        let tier = manager
            .register_standard_tier_statistics(&heap, 10_000, "OnHeap")
            .unwrap();

        get.record(store::GetOutcome::Hit);
        get.record(store::GetOutcome::Timeout);
        put.record(store::PutOutcome::Replaced);
        put.record(store::PutOutcome::Noop);

        assert_eq!(tier.hits(), 1);
        assert_eq!(tier.misses(), 1);
        assert_eq!(tier.puts(), 1);
        assert_eq!(tier.removals(), 0);

        let view = manager.cache_statistics("users").unwrap();
        let tiers = view.tier_statistics();
        let discovered = &tiers["OnHeap"];
        assert_eq!(discovered.hits(), tier.hits());
        assert_eq!(discovered.puts(), tier.puts());
    }

    #[test]
    fn absent_counters_read_as_zero_and_leave_tree_alone() {
        let manager = CacheLifecycleManager::new();
        let disk = Arc::new("disk");

        let stat = manager
            .register_store_statistic(
                &disk,
                "get",
                100,
                "Disk",
                &tier::get_translation(),
                "get",
            )
            .unwrap();

        for &outcome in tier::GetOutcome::ALL {
            assert_eq!(stat.count(outcome), 0);
        }
        assert_eq!(stat.sum(), 0);
        assert!(manager.tree().is_empty());
    }

    #[test]
    fn custom_translation_sums_sources() {
        let manager = CacheLifecycleManager::new();
        let heap = Arc::new("heap");
        let get = manager.create_operation_observer::<store::GetOutcome, _>("get", "OnHeap", &heap);
        for _ in 0..3 {
            get.record(store::GetOutcome::Hit);
        }
        get.record(store::GetOutcome::Miss);
        get.record(store::GetOutcome::Timeout);

        // timeouts are left out of every bucket
        let table = TranslationTable::builder()
            .map(tier::GetOutcome::Hit, [store::GetOutcome::Hit])
            .map(tier::GetOutcome::Miss, [store::GetOutcome::Miss])
            .build();
        let stat = manager
            .register_store_statistic(&heap, "get", 10_000, "OnHeap", &table, "strict-get")
            .unwrap();

        assert_eq!(stat.count(tier::GetOutcome::Hit), 3);
        assert_eq!(stat.count(tier::GetOutcome::Miss), 1);
    }

    #[test]
    fn overlapping_table_is_a_config_error() {
        let manager = CacheLifecycleManager::new();
        let heap = Arc::new("heap");
        manager.create_operation_observer::<store::GetOutcome, _>("get", "OnHeap", &heap);
        let nodes_before = manager.tree().node_count();

        let table = TranslationTable::builder()
            .map(tier::GetOutcome::Hit, [store::GetOutcome::Hit])
            .map(
                tier::GetOutcome::Miss,
                [store::GetOutcome::Hit, store::GetOutcome::Miss],
            )
            .build();
        let result = manager.register_store_statistic(&heap, "get", 10_000, "OnHeap", &table, "get");

        assert!(result.is_err());
        assert_eq!(manager.tree().node_count(), nodes_before);
    }
}

// ==============================================
// Pass-through and teardown
// ==============================================

mod pass_through {
    use super::*;

    #[test]
    fn mappings_gauge_tracks_store_size() {
        let manager = CacheLifecycleManager::new();
        let cache = Arc::new(TestCache);
        manager.cache_added("users", cache.clone());
        let store = Arc::new(OnHeapStore::new(&manager, &cache));

        let weak = Arc::downgrade(&store);
        manager
            .register_pass_through_statistic(
                &store.node,
                "mappings",
                ["OnHeap"],
                StatisticType::Gauge,
                move || weak.upgrade().map_or(0, |s| s.len()),
            )
            .unwrap();
        let tier = manager
            .register_standard_tier_statistics(&store.node, 10_000, "OnHeap")
            .unwrap();

        store.put();
        store.put();
        store.get(true);
        store.get(false);

        assert_eq!(tier.mappings(), Some(2));
        assert_eq!(tier.puts(), 2);
        assert_eq!(tier.hits(), 1);
        assert_eq!(tier.misses(), 1);

        let view = manager.cache_statistics("users").unwrap();
        let tiers = view.tier_statistics();
        assert_eq!(tiers["OnHeap"].mappings(), Some(2));
        assert_eq!(tiers.len(), 1);
    }

    #[test]
    fn dropped_store_reads_zero_mappings() {
        let manager = CacheLifecycleManager::new();
        let cache = Arc::new(TestCache);
        let store = Arc::new(OnHeapStore::new(&manager, &cache));
        let node = Arc::clone(&store.node);

        let weak = Arc::downgrade(&store);
        let gauge = manager
            .register_pass_through_statistic(
                &node,
                "mappings",
                ["OnHeap"],
                StatisticType::Gauge,
                move || weak.upgrade().map_or(0, |s| s.len()),
            )
            .unwrap();
        store.put();
        assert_eq!(gauge.value(), 1);

        drop(store);
        assert_eq!(gauge.value(), 0);
    }

    #[test]
    fn unsupported_kind_registers_nothing() {
        let manager = CacheLifecycleManager::new();
        let store = Arc::new("store");

        let err = manager
            .register_pass_through_statistic(&store, "ratio", ["OnHeap"], StatisticType::Ratio, || 1_u64)
            .unwrap_err();

        assert!(err.message().contains("ratio"));
        assert!(manager.tree().is_empty());
    }

    #[test]
    fn cleaning_a_store_removes_its_statistics() {
        let manager = CacheLifecycleManager::new();
        let cache = Arc::new(TestCache);
        let heap = Arc::new("heap");
        manager.associate(&heap, &cache);
        manager.create_operation_observer::<store::GetOutcome, _>("get", "OnHeap", &heap);
        manager
            .register_standard_tier_statistics(&heap, 10_000, "OnHeap")
            .unwrap();
        manager
            .register_pass_through_statistic(&heap, "mappings", ["OnHeap"], StatisticType::Gauge, || 0_u64)
            .unwrap();

        manager.clean(&heap);

        assert!(!manager.tree().contains(&heap));
        assert!(manager.tree().is_empty());
    }
}
