//! Read-side snapshots and export of cache statistics.

#[cfg(feature = "exporter")]
pub mod exporter;
pub mod snapshot;
pub mod traits;
