//! Pass-through statistics: externally computed values in the tree.
//!
//! A store that already knows a number (entry count, occupied bytes) exposes
//! it by registering a supplier. The supplier is called on every read, so
//! readers see the live value and nothing is sampled or cached here.
//!
//! Only counters and gauges can be passed through; the remaining
//! [`StatisticType`]s need windowing or composition this crate does not do.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use tierstats::pass_through::{PassThroughStatisticRegistry, StatisticType};
//! use tierstats::tree::StatisticTreeRegistry;
//!
//! let registry = PassThroughStatisticRegistry::new(Arc::new(StatisticTreeRegistry::default()));
//! let store = Arc::new(AtomicU64::new(3));
//!
//! let weak = Arc::downgrade(&store);
//! let mappings = registry
//!     .register(&store, "mappings", ["OnHeap"], StatisticType::Gauge, move || {
//!         weak.upgrade().map_or(0, |s| s.load(Ordering::Relaxed))
//!     })
//!     .unwrap();
//!
//! store.store(5, Ordering::Relaxed);
//! assert_eq!(mappings.value(), 5);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::tree::{NodeKey, StatisticDescriptor, StatisticOrigin, StatisticTreeRegistry};

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Kind of statistic a caller asks to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticType {
    /// Monotonically increasing total.
    Counter,
    /// Point-in-time level.
    Gauge,
    Rate,
    Ratio,
    Table,
}

impl fmt::Display for StatisticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatisticType::Counter => "counter",
            StatisticType::Gauge => "gauge",
            StatisticType::Rate => "rate",
            StatisticType::Ratio => "ratio",
            StatisticType::Table => "table",
        };
        f.write_str(label)
    }
}

/// Kinds a pass-through statistic can actually have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassThroughKind {
    Counter,
    Gauge,
}

impl TryFrom<StatisticType> for PassThroughKind {
    type Error = ConfigError;

    fn try_from(kind: StatisticType) -> Result<Self, Self::Error> {
        match kind {
            StatisticType::Counter => Ok(PassThroughKind::Counter),
            StatisticType::Gauge => Ok(PassThroughKind::Gauge),
            other => Err(ConfigError::new(format!(
                "statistic type '{other}' cannot be passed through"
            ))),
        }
    }
}

impl From<PassThroughKind> for StatisticType {
    fn from(kind: PassThroughKind) -> Self {
        match kind {
            PassThroughKind::Counter => StatisticType::Counter,
            PassThroughKind::Gauge => StatisticType::Gauge,
        }
    }
}

// ---------------------------------------------------------------------------
// PassThroughStatistic
// ---------------------------------------------------------------------------

/// A value computed by its supplier at read time.
pub struct PassThroughStatistic<V> {
    name: String,
    kind: PassThroughKind,
    supplier: Box<dyn Fn() -> V + Send + Sync>,
}

impl<V> PassThroughStatistic<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PassThroughKind {
        self.kind
    }

    /// Calls the supplier.
    #[inline]
    pub fn value(&self) -> V {
        (self.supplier)()
    }
}

impl<V> fmt::Debug for PassThroughStatistic<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassThroughStatistic")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PassThroughStatisticRegistry
// ---------------------------------------------------------------------------

/// Registers pass-through statistics under context nodes.
#[derive(Debug, Clone)]
pub struct PassThroughStatisticRegistry {
    tree: Arc<StatisticTreeRegistry>,
}

impl PassThroughStatisticRegistry {
    pub fn new(tree: Arc<StatisticTreeRegistry>) -> Self {
        Self { tree }
    }

    /// Exposes `supplier` under `context` as statistic `name`.
    ///
    /// The tree holds the supplier for as long as `context` stays in it, so
    /// a supplier reading from `context` should capture a `Weak`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for any kind other than counter or gauge. Nothing is
    /// registered in that case.
    pub fn register<C, V, I, T, F>(
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
        let kind = PassThroughKind::try_from(kind)?;

        let statistic = Arc::new(PassThroughStatistic {
            name: name.to_owned(),
            kind,
            supplier: Box::new(supplier),
        });
        self.tree.attach_statistic(
            context,
            NodeKey::of(&statistic),
            StatisticDescriptor::new(name, StatisticOrigin::PassThrough).with_tags(tags),
            statistic.clone(),
        );
        Ok(statistic)
    }
}
