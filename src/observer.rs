//! Operation observers and store statistic registration.
//!
//! ## Key Components
//! - [`OperationObserver`]: the recording handle a cache or store calls once
//!   per operation.
//! - [`OperationObserverFactory`]: creates observers under a context node and
//!   registers translated per-tier views over them.
//!
//! ## Core Operations
//! - `create_operation_observer`: always succeeds; one direct statistic per
//!   call, hung under the given context.
//! - `register_store_statistic`: validate the table, look the direct
//!   statistic up once, then either translate it (and attach the result under
//!   the store) or hand back a [`ZeroStatistic`] without touching the tree.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use tierstats::observer::OperationObserverFactory;
//! use tierstats::outcome::{store, tier};
//! use tierstats::statistic::OperationStatistic;
//! use tierstats::tree::StatisticTreeRegistry;
//!
//! let factory = OperationObserverFactory::new(Arc::new(StatisticTreeRegistry::default()));
//! let on_heap = Arc::new("on-heap store");
//!
//! let get = factory.create_operation_observer::<store::GetOutcome, _>("get", "OnHeap", &on_heap);
//! get.record(store::GetOutcome::Timeout);
//!
//! let hits = factory
//!     .register_store_statistic(&on_heap, "get", 10_000, "OnHeap", &tier::get_translation(), "get")
//!     .unwrap();
//! assert_eq!(hits.count(tier::GetOutcome::Miss), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::outcome::{Outcome, tier};
use crate::statistic::names;
use crate::statistic::{
    DirectStatistic, SharedStatistic, TranslationTable, ZeroStatistic, translate,
};
use crate::tree::{
    NodeKey, StatisticDescriptor, StatisticOrigin, StatisticQuery, StatisticTreeRegistry,
    liveness_check,
};
use crate::view::TierStatistics;

// ---------------------------------------------------------------------------
// OperationObserver
// ---------------------------------------------------------------------------

/// Recording handle for one operation of outcome type `T`.
///
/// Cheap to clone; clones record into the same counters.
pub struct OperationObserver<T: Outcome> {
    statistic: Arc<DirectStatistic<T>>,
}

impl<T: Outcome> OperationObserver<T> {
    /// Records one operation that ended in `outcome`.
    #[inline]
    pub fn record(&self, outcome: T) {
        self.statistic.record(outcome);
    }

    /// The counters this observer writes.
    pub fn statistic(&self) -> &Arc<DirectStatistic<T>> {
        &self.statistic
    }
}

impl<T: Outcome> Clone for OperationObserver<T> {
    fn clone(&self) -> Self {
        Self {
            statistic: Arc::clone(&self.statistic),
        }
    }
}

impl<T: Outcome> fmt::Debug for OperationObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationObserver")
            .field("name", &self.statistic.name())
            .field("counts", &self.statistic)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// OperationObserverFactory
// ---------------------------------------------------------------------------

/// Creates observers and translated statistics inside a statistics tree.
#[derive(Debug, Clone)]
pub struct OperationObserverFactory {
    tree: Arc<StatisticTreeRegistry>,
}

impl OperationObserverFactory {
    pub fn new(tree: Arc<StatisticTreeRegistry>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Arc<StatisticTreeRegistry> {
        &self.tree
    }

    /// Creates an observer whose counters hang under `context`, tagged `tag`.
    ///
    /// Never fails. Several observers may share a context and even a name;
    /// each call creates fresh counters.
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
        let statistic = Arc::new(DirectStatistic::<T>::new(name));
        let shared: SharedStatistic<T> = statistic.clone();
        self.tree.attach_statistic(
            context,
            NodeKey::of(&statistic),
            StatisticDescriptor::new(name, StatisticOrigin::Direct).with_tags([tag]),
            Arc::new(shared),
        );
        OperationObserver { statistic }
    }

    /// Direct statistic of outcome type `S` named `name` below `store`.
    ///
    /// Nearest match wins when several exist.
    pub fn find_direct_statistic<S, C>(&self, store: &Arc<C>, name: &str) -> Option<SharedStatistic<S>>
    where
        S: Outcome,
        C: ?Sized,
    {
        let query = StatisticQuery::named(name).origin(StatisticOrigin::Direct);
        self.tree
            .find_statistics::<C, SharedStatistic<S>>(store, &query)
            .into_iter()
            .next()
            .map(|found| Arc::clone(&*found.statistic))
    }

    /// Exposes the `S`-typed direct statistic `target_name` of `store` as an
    /// `O`-typed statistic named `statistic_name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when `table` is invalid. This is checked before the
    /// lookup, so a bad table fails even for stores that record nothing.
    ///
    /// When the direct statistic does not exist the result is a
    /// [`ZeroStatistic`] and the tree is left untouched.
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
        table.validate()?;

        let Some(source) = self.find_direct_statistic::<S, C>(store, target_name) else {
            log::trace!(
                "no '{}' statistic under {:?}; '{}' reads as zero",
                target_name,
                NodeKey::of(store),
                statistic_name
            );
            return Ok(ZeroStatistic::shared());
        };

        let translated = Arc::new(translate(table, source)?);
        let key = NodeKey::of(&translated);
        let shared: SharedStatistic<O> = translated;
        self.tree.attach_statistic(
            store,
            key,
            StatisticDescriptor::new(statistic_name, StatisticOrigin::Translated)
                .with_tags([tag])
                .with_tier_height(tier_height),
            Arc::new(shared.clone()),
        );
        Ok(shared)
    }

    /// Registers the standard store-to-tier translations for one tier.
    ///
    /// Each of `get`, `put`, `remove`, `eviction` and `expiration` is
    /// translated when the store records it and reads as zero otherwise.
    pub fn register_standard_tier_statistics<C>(
        &self,
        store: &Arc<C>,
        tier_height: i32,
        tag: &str,
    ) -> Result<TierStatistics, ConfigError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let get = self.register_store_statistic(
            store,
            names::GET,
            tier_height,
            tag,
            &tier::get_translation(),
            names::GET,
        )?;
        let put = self.register_store_statistic(
            store,
            names::PUT,
            tier_height,
            tag,
            &tier::put_translation(),
            names::PUT,
        )?;
        let removal = self.register_store_statistic(
            store,
            names::REMOVE,
            tier_height,
            tag,
            &tier::removal_translation(),
            names::REMOVE,
        )?;
        let eviction = self.register_store_statistic(
            store,
            names::EVICTION,
            tier_height,
            tag,
            &tier::eviction_translation(),
            names::EVICTION,
        )?;
        let expiration = self.register_store_statistic(
            store,
            names::EXPIRATION,
            tier_height,
            tag,
            &tier::expiration_translation(),
            names::EXPIRATION,
        )?;

        Ok(TierStatistics {
            tier: tag.to_owned(),
            tier_height,
            owner: NodeKey::of(store),
            owner_alive: Some(liveness_check(store)),
            tree: Arc::clone(&self.tree),
            get,
            put,
            removal,
            eviction,
            expiration,
        })
    }
}
