//! Lifecycle binding between an owning cache registry and the statistics
//! service.
//!
//! The owning registry is the only event source. It tells the
//! [`CacheLifecycleManager`] when it becomes available, goes back to
//! uninitialized or enters maintenance, and when caches come and go. The
//! manager keeps exactly one [`CacheStatisticsView`] per live cache alias.
//!
//! ## State machine
//!
//! ```text
//!                 start()                      Available
//!   ┌─────────┐ ──────────► ┌──────────┐ ─────────────────► ┌──────────┐
//!   │ stopped │             │ listening│                    │  synced  │
//!   └─────────┘ ◄────────── └──────────┘ ◄───────────────── └──────────┘
//!        ▲     stop() /          │           CacheAdded /        │
//!        │     Uninitialized     │           CacheRemoved        │
//!        │                       │                               │
//!        └───────────────────────┴─── Maintenance (error) ───────┘
//! ```
//!
//! - `start` refuses a registry in maintenance and leaves no listener behind.
//! - `Available` enumerates the configured caches and binds a view to each.
//! - `Uninitialized` and `stop` drop every view and the registry reference;
//!   the manager can be started again afterwards.
//! - `Maintenance` does the same and then reports [`LifecycleError::Maintenance`].
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use tierstats::lifecycle::{CacheHandle, CacheLifecycleManager};
//! use tierstats::outcome::cache::GetOutcome;
//!
//! struct OrdersCache;
//! impl CacheHandle for OrdersCache {}
//!
//! let manager = CacheLifecycleManager::new();
//! let orders = Arc::new(OrdersCache);
//! manager.cache_added("orders", orders.clone());
//!
//! let get = manager.create_operation_observer::<GetOutcome, _>("get", "cache", &orders);
//! get.record(GetOutcome::Hit);
//!
//! let stats = manager.cache_statistics("orders").unwrap();
//! assert_eq!(stats.cache_hits(), 1);
//!
//! manager.cache_removed("orders", orders);
//! assert!(manager.cache_statistics("orders").is_err());
//! ```

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::builder::{StatisticsConfig, StatisticsServiceBuilder};
use crate::error::{ConfigError, LifecycleError, UnknownCacheError};
use crate::metrics::snapshot::{CacheReport, StatisticsReport};
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::observer::{OperationObserver, OperationObserverFactory};
use crate::outcome::Outcome;
use crate::pass_through::{PassThroughStatistic, PassThroughStatisticRegistry, StatisticType};
use crate::statistic::{SharedStatistic, TranslationTable};
use crate::tree::{NodeKey, StatisticTreeRegistry};
use crate::view::{CacheStatisticsView, TierStatistics};

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

/// Lifecycle state of the owning cache registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Available,
    Maintenance,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Available => "available",
            LifecycleState::Maintenance => "maintenance",
        };
        f.write_str(label)
    }
}

/// Marker for cache instances the registry hands out.
///
/// Only the identity of the `Arc` matters: statistics are found by walking
/// the tree down from it.
pub trait CacheHandle: Send + Sync + 'static {}

/// Event delivered by the owning registry.
#[derive(Clone)]
pub enum LifecycleEvent {
    Available { from: LifecycleState },
    Uninitialized { from: LifecycleState },
    Maintenance { from: LifecycleState },
    CacheAdded { alias: String, cache: Arc<dyn CacheHandle> },
    CacheRemoved { alias: String, cache: Arc<dyn CacheHandle> },
}

impl LifecycleEvent {
    /// Event for a state transition `from → to`.
    pub fn transition(from: LifecycleState, to: LifecycleState) -> Self {
        match to {
            LifecycleState::Available => LifecycleEvent::Available { from },
            LifecycleState::Uninitialized => LifecycleEvent::Uninitialized { from },
            LifecycleState::Maintenance => LifecycleEvent::Maintenance { from },
        }
    }
}

impl fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Available { from } => {
                f.debug_struct("Available").field("from", from).finish()
            },
            LifecycleEvent::Uninitialized { from } => {
                f.debug_struct("Uninitialized").field("from", from).finish()
            },
            LifecycleEvent::Maintenance { from } => {
                f.debug_struct("Maintenance").field("from", from).finish()
            },
            LifecycleEvent::CacheAdded { alias, cache } => f
                .debug_struct("CacheAdded")
                .field("alias", alias)
                .field("cache", &NodeKey::of(cache))
                .finish(),
            LifecycleEvent::CacheRemoved { alias, cache } => f
                .debug_struct("CacheRemoved")
                .field("alias", alias)
                .field("cache", &NodeKey::of(cache))
                .finish(),
        }
    }
}

/// Subscriber to registry events.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), LifecycleError>;
}

/// `true` when both handles point at the same listener.
pub fn same_listener(a: &Arc<dyn LifecycleListener>, b: &Arc<dyn LifecycleListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ---------------------------------------------------------------------------
// Owning registry interface
// ---------------------------------------------------------------------------

/// Runtime type of a cache key or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// What the registry knows about a configured cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheConfiguration {
    pub key_type: TypeTag,
    pub value_type: TypeTag,
}

impl CacheConfiguration {
    pub fn of<K: 'static, V: 'static>() -> Self {
        Self {
            key_type: TypeTag::of::<K>(),
            value_type: TypeTag::of::<V>(),
        }
    }
}

/// The cache registry the statistics service binds to.
pub trait CacheRegistry: Send + Sync {
    fn state(&self) -> LifecycleState;

    fn register_listener(&self, listener: Arc<dyn LifecycleListener>);

    /// Removes `listener` (compared with [`same_listener`]) if registered.
    fn deregister_listener(&self, listener: &Arc<dyn LifecycleListener>);

    /// Configured caches, in a stable order.
    fn configured_caches(&self) -> Vec<(String, CacheConfiguration)>;

    /// Live handle for `alias`, if the cache exists with those types.
    fn cache(
        &self,
        alias: &str,
        key_type: TypeTag,
        value_type: TypeTag,
    ) -> Option<Arc<dyn CacheHandle>>;
}

// ---------------------------------------------------------------------------
// CacheLifecycleManager
// ---------------------------------------------------------------------------

/// Listener handed to the registry. Holds the manager weakly so the registry
/// never keeps it alive.
struct ManagerListener {
    manager: Weak<CacheLifecycleManager>,
}

impl LifecycleListener for ManagerListener {
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), LifecycleError> {
        match self.manager.upgrade() {
            Some(manager) => manager.on_event(event),
            None => Ok(()),
        }
    }
}

/// Registry the manager is currently started against.
///
/// `epoch` tells one `start` apart from the next, so a start that raced with
/// `stop` can tell whether its binding is still the live one.
struct RegistryBinding {
    registry: Arc<dyn CacheRegistry>,
    epoch: u64,
}

/// Entry point of the statistics service.
///
/// Owns the statistics tree, the observer factory and the pass-through
/// registry, and keeps one view per cache alias in step with the owning
/// registry's lifecycle.
pub struct CacheLifecycleManager {
    config: StatisticsConfig,
    tree: Arc<StatisticTreeRegistry>,
    observers: OperationObserverFactory,
    pass_through: PassThroughStatisticRegistry,
    views: RwLock<FxHashMap<String, Arc<CacheStatisticsView>>>,
    // lock order: `registry` before `views`
    registry: Mutex<Option<RegistryBinding>>,
    epochs: AtomicU64,
    listener: Arc<dyn LifecycleListener>,
}

impl CacheLifecycleManager {
    pub fn builder() -> StatisticsServiceBuilder {
        StatisticsServiceBuilder::new()
    }

    /// Manager with the default configuration.
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    pub(crate) fn with_config(config: StatisticsConfig) -> Arc<Self> {
        let tree = Arc::new(StatisticTreeRegistry::new(config.tree_shards, config.shard_seed));
        Arc::new_cyclic(|me| Self {
            config,
            observers: OperationObserverFactory::new(Arc::clone(&tree)),
            pass_through: PassThroughStatisticRegistry::new(Arc::clone(&tree)),
            tree,
            views: RwLock::new(FxHashMap::default()),
            registry: Mutex::new(None),
            epochs: AtomicU64::new(0),
            listener: Arc::new(ManagerListener {
                manager: Weak::clone(me),
            }),
        })
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Binds to `registry` and starts listening to it.
    ///
    /// Views are created right away when the registry is already available;
    /// otherwise they follow its `Available` transition.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Maintenance`] when the registry is in maintenance.
    ///   No listener is registered.
    /// - [`LifecycleError::AlreadyStarted`] when bound to a registry already.
    pub fn start(&self, registry: Arc<dyn CacheRegistry>) -> Result<(), LifecycleError> {
        let state = registry.state();
        if state == LifecycleState::Maintenance {
            log::debug!("refusing to start statistics service: registry in maintenance");
            return Err(LifecycleError::Maintenance { from: state });
        }

        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = self.registry.lock();
            if slot.is_some() {
                return Err(LifecycleError::AlreadyStarted);
            }
            *slot = Some(RegistryBinding {
                registry: Arc::clone(&registry),
                epoch,
            });
        }
        // Registered outside the lock: the registry may call back into us.
        registry.register_listener(Arc::clone(&self.listener));
        if !self.is_bound(epoch) {
            // stopped before the listener went in; nobody else will remove it
            registry.deregister_listener(&self.listener);
            log::debug!("statistics service stopped while starting");
            return Ok(());
        }
        log::debug!("statistics service started (registry {})", state);

        if state == LifecycleState::Available {
            self.sync_caches(registry.as_ref(), epoch);
        }
        Ok(())
    }

    fn is_bound(&self, epoch: u64) -> bool {
        self.registry
            .lock()
            .as_ref()
            .is_some_and(|binding| binding.epoch == epoch)
    }

    /// Stops listening and drops every view, whatever the current state.
    pub fn stop(&self) {
        self.shutdown();
        log::debug!("statistics service stopped");
    }

    pub fn is_started(&self) -> bool {
        self.registry.lock().is_some()
    }

    /// Reacts to the owning registry moving from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotStarted`] for `Available` before [`start`](Self::start).
    /// - [`LifecycleError::Maintenance`] for `Maintenance`, after the views
    ///   are dropped and the listener is removed.
    pub fn state_transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleError> {
        log::debug!("registry transition {} -> {}", from, to);
        match to {
            LifecycleState::Available => {
                let (registry, epoch) =
                    self.current_binding().ok_or(LifecycleError::NotStarted)?;
                self.sync_caches(registry.as_ref(), epoch);
                Ok(())
            },
            LifecycleState::Uninitialized => {
                self.shutdown();
                Ok(())
            },
            LifecycleState::Maintenance => {
                self.shutdown();
                Err(LifecycleError::Maintenance { from })
            },
        }
    }

    fn current_binding(&self) -> Option<(Arc<dyn CacheRegistry>, u64)> {
        self.registry
            .lock()
            .as_ref()
            .map(|binding| (Arc::clone(&binding.registry), binding.epoch))
    }

    /// Binds a view to every configured cache the registry can resolve.
    ///
    /// Handles are resolved first; the views go in only while the `epoch`
    /// binding is still live, so a concurrent stop never sees them appear
    /// after it cleared the map.
    fn sync_caches(&self, registry: &dyn CacheRegistry, epoch: u64) {
        let mut resolved = Vec::new();
        for (alias, configuration) in registry.configured_caches() {
            match registry.cache(&alias, configuration.key_type, configuration.value_type) {
                Some(cache) => resolved.push((alias, cache)),
                None => log::warn!(
                    "skipping cache '{}' ({} -> {}): no live handle",
                    alias,
                    configuration.key_type.name(),
                    configuration.value_type.name()
                ),
            }
        }

        let binding = self.registry.lock();
        if !binding.as_ref().is_some_and(|b| b.epoch == epoch) {
            log::debug!("statistics service stopped during cache sync");
            return;
        }
        for (alias, cache) in resolved {
            self.cache_added(&alias, cache);
        }
    }

    fn shutdown(&self) {
        let (binding, dropped) = {
            let mut slot = self.registry.lock();
            let binding = slot.take();
            let mut views = self.views.write();
            let count = views.len();
            views.clear();
            (binding, count)
        };
        if let Some(binding) = binding {
            binding.registry.deregister_listener(&self.listener);
        }
        if dropped > 0 {
            log::debug!("dropped {} cache statistics views", dropped);
        }
    }

    // -- Membership ---------------------------------------------------------

    /// Binds a fresh view for `alias` to `cache`, replacing any earlier one.
    ///
    /// When the replaced view was bound to a different cache, that cache's
    /// statistics are cleaned from the tree.
    pub fn cache_added(&self, alias: &str, cache: Arc<dyn CacheHandle>) {
        let view = Arc::new(CacheStatisticsView::new(alias, cache, Arc::clone(&self.tree)));
        let previous = self
            .views
            .write()
            .insert(alias.to_owned(), Arc::clone(&view));

        match previous {
            Some(previous) if !previous.is_bound_to(view.cache()) => {
                let removed = self.tree.clean_key(previous.cache_key());
                log::debug!(
                    "cache '{}' rebound to {:?}; cleaned {} entries of {:?}",
                    alias,
                    view.cache_key(),
                    removed,
                    previous.cache_key()
                );
            },
            Some(_) => log::debug!("cache '{}' re-added", alias),
            None => log::debug!("cache '{}' added", alias),
        }
    }

    /// Drops the view for `alias` and cleans the removed cache from the tree.
    ///
    /// Only the handle named by the event is cleaned. A late removal of a
    /// handle that `alias` was since rebound away from leaves the live
    /// cache's statistics in place. Unknown aliases are ignored.
    pub fn cache_removed(&self, alias: &str, cache: Arc<dyn CacheHandle>) {
        let removed = self.views.write().remove(alias);
        let Some(view) = removed else {
            log::trace!("ignoring removal of unknown cache '{}'", alias);
            return;
        };
        if !view.is_bound_to(&cache) {
            log::debug!(
                "cache '{}' removed with handle {:?}, view was bound to {:?}",
                alias,
                NodeKey::of(&cache),
                view.cache_key()
            );
        }
        self.tree.clean_key(NodeKey::of(&cache));
        log::debug!("cache '{}' removed", alias);
    }

    // -- Queries ------------------------------------------------------------

    /// Statistics view of `alias`.
    pub fn cache_statistics(&self, alias: &str) -> Result<Arc<CacheStatisticsView>, UnknownCacheError> {
        self.views
            .read()
            .get(alias)
            .cloned()
            .ok_or_else(|| UnknownCacheError::new(alias))
    }

    /// Aliases with a live view, sorted.
    pub fn cache_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.views.read().keys().cloned().collect();
        aliases.sort_unstable();
        aliases
    }

    /// Snapshot of every live view, ordered by alias.
    pub fn report(&self) -> StatisticsReport {
        let mut views: Vec<Arc<CacheStatisticsView>> = self.views.read().values().cloned().collect();
        views.sort_unstable_by(|a, b| a.alias().cmp(b.alias()));
        StatisticsReport {
            caches: views
                .iter()
                .map(|view| CacheReport {
                    alias: view.alias().to_owned(),
                    cache: view.snapshot(),
                    tiers: view.tier_snapshots(),
                })
                .collect(),
        }
    }

    // -- Statistics wiring --------------------------------------------------

    pub fn tree(&self) -> &Arc<StatisticTreeRegistry> {
        &self.tree
    }

    pub fn observers(&self) -> &OperationObserverFactory {
        &self.observers
    }

    pub fn pass_through(&self) -> &PassThroughStatisticRegistry {
        &self.pass_through
    }

    /// See [`StatisticTreeRegistry::associate`].
    pub fn associate<N, P>(&self, node: &Arc<N>, parent: &Arc<P>) -> bool
    where
        N: ?Sized + Send + Sync + 'static,
        P: ?Sized + Send + Sync + 'static,
    {
        self.tree.associate(node, parent)
    }

    /// See [`StatisticTreeRegistry::dissociate`].
    pub fn dissociate<N: ?Sized, P: ?Sized>(&self, node: &Arc<N>, parent: &Arc<P>) -> bool {
        self.tree.dissociate(node, parent)
    }

    /// See [`StatisticTreeRegistry::clean`].
    pub fn clean<N: ?Sized>(&self, node: &Arc<N>) -> usize {
        self.tree.clean(node)
    }

    /// See [`OperationObserverFactory::create_operation_observer`].
    pub fn create_operation_observer<T, C>(
        &self,
        name: &str,
        tag: &str,
        context: &Arc<C>,
    ) -> OperationObserver<T>
    where
        T: Outcome,
        C: ?Sized + Send + Sync + 'static,
    {
        self.observers.create_operation_observer(name, tag, context)
    }

    /// See [`OperationObserverFactory::register_store_statistic`].
    pub fn register_store_statistic<S, O, C>(
        &self,
        store: &Arc<C>,
        target_name: &str,
        tier_height: i32,
        tag: &str,
        table: &TranslationTable<O, S>,
        statistic_name: &str,
    ) -> Result<SharedStatistic<O>, ConfigError>
    where
        S: Outcome,
        O: Outcome,
        C: ?Sized + Send + Sync + 'static,
    {
        self.observers
            .register_store_statistic(store, target_name, tier_height, tag, table, statistic_name)
    }

    /// See [`OperationObserverFactory::register_standard_tier_statistics`].
    pub fn register_standard_tier_statistics<C>(
        &self,
        store: &Arc<C>,
        tier_height: i32,
        tag: &str,
    ) -> Result<TierStatistics, ConfigError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.observers
            .register_standard_tier_statistics(store, tier_height, tag)
    }

    /// See [`PassThroughStatisticRegistry::register`].
    pub fn register_pass_through_statistic<C, V, I, T, F>(
        &self,
        context: &Arc<C>,
        name: &str,
        tags: I,
        kind: StatisticType,
        supplier: F,
    ) -> Result<Arc<PassThroughStatistic<V>>, ConfigError>
    where
        C: ?Sized + Send + Sync + 'static,
        V: Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: Into<String>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.pass_through
            .register(context, name, tags, kind, supplier)
    }
}

impl LifecycleListener for CacheLifecycleManager {
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), LifecycleError> {
        match event {
            LifecycleEvent::Available { from } => {
                self.state_transition(*from, LifecycleState::Available)
            },
            LifecycleEvent::Uninitialized { from } => {
                self.state_transition(*from, LifecycleState::Uninitialized)
            },
            LifecycleEvent::Maintenance { from } => {
                self.state_transition(*from, LifecycleState::Maintenance)
            },
            LifecycleEvent::CacheAdded { alias, cache } => {
                self.cache_added(alias, Arc::clone(cache));
                Ok(())
            },
            LifecycleEvent::CacheRemoved { alias, cache } => {
                self.cache_removed(alias, Arc::clone(cache));
                Ok(())
            },
        }
    }
}

impl fmt::Debug for CacheLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLifecycleManager")
            .field("started", &self.is_started())
            .field("caches", &self.cache_aliases())
            .field("tree", &self.tree)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::cache::GetOutcome;

    struct TestCache;
    impl CacheHandle for TestCache {}

    fn handle() -> Arc<dyn CacheHandle> {
        Arc::new(TestCache)
    }

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(LifecycleState::Available.to_string(), "available");
        assert_eq!(LifecycleState::Maintenance.to_string(), "maintenance");
        assert_eq!(LifecycleState::Uninitialized.to_string(), "uninitialized");
    }

    #[test]
    fn transition_event_matches_target_state() {
        let event = LifecycleEvent::transition(LifecycleState::Uninitialized, LifecycleState::Available);
        assert!(matches!(
            event,
            LifecycleEvent::Available {
                from: LifecycleState::Uninitialized
            }
        ));
    }

    #[test]
    fn available_before_start_is_rejected() {
        let manager = CacheLifecycleManager::new();
        let err = manager
            .state_transition(LifecycleState::Uninitialized, LifecycleState::Available)
            .unwrap_err();
        assert_eq!(err, LifecycleError::NotStarted);
    }

    #[test]
    fn maintenance_transition_clears_views_and_fails() {
        let manager = CacheLifecycleManager::new();
        manager.cache_added("a", handle());

        let err = manager
            .state_transition(LifecycleState::Available, LifecycleState::Maintenance)
            .unwrap_err();

        assert_eq!(
            err,
            LifecycleError::Maintenance {
                from: LifecycleState::Available
            }
        );
        assert!(manager.cache_statistics("a").is_err());
    }

    #[test]
    fn readding_alias_replaces_view() {
        let manager = CacheLifecycleManager::new();
        let (first, second) = (handle(), handle());
        manager.cache_added("x", Arc::clone(&first));
        manager.cache_added("x", Arc::clone(&second));

        let view = manager.cache_statistics("x").unwrap();
        assert!(view.is_bound_to(&second));
        assert!(!view.is_bound_to(&first));
        assert_eq!(manager.cache_aliases(), vec!["x".to_string()]);
    }

    #[test]
    fn rebinding_cleans_previous_cache_statistics() {
        let manager = CacheLifecycleManager::new();
        let first = Arc::new(TestCache);
        manager.cache_added("x", first.clone());
        let get = manager.create_operation_observer::<GetOutcome, _>("get", "cache", &first);
        get.record(GetOutcome::Hit);
        assert!(manager.tree().contains(&first));

        manager.cache_added("x", handle());

        assert!(!manager.tree().contains(&first));
        assert_eq!(manager.cache_statistics("x").unwrap().cache_hits(), 0);
    }

    #[test]
    fn same_handle_readd_keeps_statistics() {
        let manager = CacheLifecycleManager::new();
        let cache = Arc::new(TestCache);
        manager.cache_added("x", cache.clone());
        let get = manager.create_operation_observer::<GetOutcome, _>("get", "cache", &cache);
        get.record(GetOutcome::Miss);

        manager.cache_added("x", cache.clone());

        assert_eq!(manager.cache_statistics("x").unwrap().cache_misses(), 1);
    }

    #[test]
    fn removing_unknown_alias_is_noop() {
        let manager = CacheLifecycleManager::new();
        manager.cache_added("a", handle());
        manager.cache_removed("missing", handle());
        assert_eq!(manager.cache_aliases(), vec!["a".to_string()]);
    }

    #[test]
    fn removal_cleans_cache_node() {
        let manager = CacheLifecycleManager::new();
        let cache = Arc::new(TestCache);
        manager.cache_added("a", cache.clone());
        manager.create_operation_observer::<GetOutcome, _>("get", "cache", &cache);

        manager.cache_removed("a", cache.clone());

        assert!(manager.tree().is_empty());
        assert_eq!(
            manager.cache_statistics("a").unwrap_err(),
            UnknownCacheError::new("a")
        );
    }

    #[test]
    fn listener_events_are_dispatched() {
        let manager = CacheLifecycleManager::new();
        let cache = handle();
        manager
            .on_event(&LifecycleEvent::CacheAdded {
                alias: "a".to_string(),
                cache: Arc::clone(&cache),
            })
            .unwrap();
        assert!(manager.cache_statistics("a").is_ok());

        manager
            .on_event(&LifecycleEvent::CacheRemoved {
                alias: "a".to_string(),
                cache,
            })
            .unwrap();
        assert!(manager.cache_statistics("a").is_err());
    }

    #[test]
    fn registered_listener_does_not_keep_manager_alive() {
        let manager = CacheLifecycleManager::new();
        let listener = Arc::clone(&manager.listener);
        let weak = Arc::downgrade(&manager);
        drop(manager);

        assert!(weak.upgrade().is_none());
        let event = LifecycleEvent::transition(LifecycleState::Available, LifecycleState::Maintenance);
        assert!(listener.on_event(&event).is_ok());
    }

    #[test]
    fn same_listener_compares_identity() {
        let a: Arc<dyn LifecycleListener> = Arc::new(ManagerListener { manager: Weak::new() });
        let b: Arc<dyn LifecycleListener> = Arc::new(ManagerListener { manager: Weak::new() });
        assert!(same_listener(&a, &a.clone()));
        assert!(!same_listener(&a, &b));
    }

    #[test]
    fn report_lists_caches_in_alias_order() {
        let manager = CacheLifecycleManager::new();
        manager.cache_added("b", handle());
        manager.cache_added("a", handle());

        let report = manager.report();
        let aliases: Vec<&str> = report.caches.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["a", "b"]);
        assert!(report.cache("a").is_some());
    }
}
