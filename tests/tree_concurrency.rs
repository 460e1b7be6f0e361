// ==============================================
// STATISTICS TREE CONCURRENCY TESTS (integration)
// ==============================================
//
// Hammers StatisticTreeRegistry from several threads. Readers must only ever
// see edges that were written, and concurrent clean/associate pairs must
// leave every surviving edge recorded on both ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tierstats::observer::OperationObserverFactory;
use tierstats::outcome::store;
use tierstats::statistic::OperationStatistic;
use tierstats::tree::{NodeKey, StatisticTreeRegistry};

// ==============================================
// Disjoint nodes
// ==============================================

mod disjoint {
    use super::*;

    #[test]
    fn concurrent_associations_on_disjoint_nodes_all_land() {
        let tree = Arc::new(StatisticTreeRegistry::new(8, 3));
        let threads = 8;
        let per_thread = 200;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let tree = Arc::clone(&tree);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let parent = Arc::new(0_u64);
                    let children: Vec<Arc<u64>> = (0..per_thread).map(|i| Arc::new(i as u64)).collect();
                    barrier.wait();
                    for child in &children {
                        assert!(tree.associate(child, &parent));
                    }
                    assert_eq!(tree.children(&parent).len(), per_thread);
                    for child in &children {
                        assert!(tree.dissociate(child, &parent));
                    }
                    assert!(!tree.contains(&parent));
                    // keep allocations alive until every edge is gone
                    drop(children);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(tree.is_empty());
    }
}

// ==============================================
// Shared parent
// ==============================================

mod shared_parent {
    use super::*;

    #[test]
    fn readers_only_see_registered_edges() {
        let iterations = 200;

        for _ in 0..iterations {
            let tree = Arc::new(StatisticTreeRegistry::new(4, 11));
            let cache = Arc::new("cache");
            let stores: Vec<Arc<String>> = (0..4).map(|i| Arc::new(format!("store-{i}"))).collect();
            let barrier = Arc::new(Barrier::new(3));
            let done = Arc::new(AtomicBool::new(false));

            let writer = {
                let (tree, cache, stores, barrier) =
                    (Arc::clone(&tree), Arc::clone(&cache), stores.clone(), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    for store in &stores {
                        tree.associate(store, &cache);
                    }
                    for store in &stores {
                        tree.dissociate(store, &cache);
                    }
                })
            };

            let reader = {
                let (tree, cache, stores, barrier, done) = (
                    Arc::clone(&tree),
                    Arc::clone(&cache),
                    stores.clone(),
                    Arc::clone(&barrier),
                    Arc::clone(&done),
                );
                thread::spawn(move || {
                    let known: Vec<NodeKey> = stores.iter().map(NodeKey::of).collect();
                    barrier.wait();
                    while !done.load(Ordering::Acquire) {
                        for child in tree.children(&cache) {
                            assert!(known.contains(&child), "unknown child {child:?}");
                        }
                        for store in &stores {
                            for parent in tree.parents(store) {
                                assert_eq!(parent, NodeKey::of(&cache));
                            }
                        }
                    }
                })
            };

            barrier.wait();
            writer.join().unwrap();
            done.store(true, Ordering::Release);
            reader.join().unwrap();

            assert!(tree.is_empty());
        }
    }

    #[test]
    fn concurrent_clean_and_associate_leave_consistent_edges() {
        let iterations = 200;

        for _ in 0..iterations {
            let tree = Arc::new(StatisticTreeRegistry::new(4, 5));
            let cache = Arc::new("cache");
            let store = Arc::new("store");
            tree.associate(&store, &cache);
            let barrier = Arc::new(Barrier::new(2));

            let cleaner = {
                let (tree, cache, barrier) = (Arc::clone(&tree), Arc::clone(&cache), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    tree.clean(&cache);
                })
            };
            let linker = {
                let (tree, store, barrier) = (Arc::clone(&tree), Arc::clone(&store), Arc::clone(&barrier));
                let other = Arc::new("other parent");
                thread::spawn(move || {
                    barrier.wait();
                    tree.associate(&store, &other);
                    other
                })
            };

            cleaner.join().unwrap();
            let other = linker.join().unwrap();

            // every edge that survived is recorded on both ends
            for parent in tree.parents(&store) {
                assert!(tree.children_of(parent).contains(&NodeKey::of(&store)));
            }
            assert!(!tree.contains(&cache));
            assert!(tree.is_associated(&store, &other) || !tree.contains(&store));
        }
    }
}

// ==============================================
// Recording
// ==============================================

mod recording {
    use super::*;

    #[test]
    fn observers_count_every_concurrent_record() {
        let factory = OperationObserverFactory::new(Arc::new(StatisticTreeRegistry::default()));
        let store = Arc::new("store");
        let observer = factory.create_operation_observer::<store::GetOutcome, _>("get", "OnHeap", &store);
        let threads = 8;
        let per_thread = 10_000;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let observer = observer.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let outcome = if t % 2 == 0 {
                        store::GetOutcome::Hit
                    } else {
                        store::GetOutcome::Miss
                    };
                    for _ in 0..per_thread {
                        observer.record(outcome);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stat = observer.statistic();
        assert_eq!(stat.count(store::GetOutcome::Hit), 4 * per_thread);
        assert_eq!(stat.count(store::GetOutcome::Miss), 4 * per_thread);
        assert_eq!(stat.sum(), (threads as u64) * per_thread);
    }
}
