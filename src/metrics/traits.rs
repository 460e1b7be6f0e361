//! # Metrics Consumption Traits
//!
//! Recording happens through operation observers; everything here is on the
//! read side. The split mirrors the rest of the crate: views only derive
//! counts, exporters only publish them.
//!
//! ```text
//!   OperationObserver ──► DirectStatistic ──► CacheStatisticsView
//!                                                   │
//!                       ┌───────────────────────────┴───────────────┐
//!                       ▼                                           ▼
//!          ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!          │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!          │ MetricsReset                 │    │ (production monitoring)      │
//!          └──────────────────────────────┘    └──────────────────────────────┘
//! ```

/// Point-in-time snapshot of a metrics source.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset the counts a provider reports, e.g. between test runs.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
