pub use crate::builder::{StatisticsConfig, StatisticsServiceBuilder};
pub use crate::error::{ConfigError, LifecycleError, UnknownCacheError};
pub use crate::lifecycle::{
    CacheConfiguration, CacheHandle, CacheLifecycleManager, CacheRegistry, LifecycleEvent,
    LifecycleListener, LifecycleState, TypeTag,
};
#[cfg(feature = "exporter")]
pub use crate::metrics::exporter::PrometheusTextExporter;
pub use crate::metrics::snapshot::{
    CacheReport, CacheStatisticsSnapshot, StatisticsReport, TierStatisticsSnapshot,
};
pub use crate::metrics::traits::{MetricsExporter, MetricsReset, MetricsSnapshotProvider};
pub use crate::observer::{OperationObserver, OperationObserverFactory};
pub use crate::outcome::Outcome;
pub use crate::pass_through::{PassThroughStatistic, StatisticType};
pub use crate::statistic::{OperationStatistic, SharedStatistic, TranslationTable, ZeroStatistic};
pub use crate::tree::{NodeKey, StatisticTreeRegistry};
pub use crate::view::{CacheStatisticsView, TierStatistics};
