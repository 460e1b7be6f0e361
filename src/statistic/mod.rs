//! # Operation Statistics
//!
//! Read-side views over recorded outcome counts. Recording and reading are
//! split the same way the rest of the crate splits them: observers only
//! write counters, statistics only read them.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌───────────────────────────────┐
//!                      │    OperationStatistic<T>      │
//!                      │   count(outcome) / sum()      │
//!                      └───────────────┬───────────────┘
//!                                      │
//!          ┌───────────────────────────┼───────────────────────────┐
//!          ▼                           ▼                           ▼
//!  ┌───────────────┐        ┌─────────────────────┐        ┌───────────────┐
//!  │ Direct<T>     │        │ Translated<T, S>    │        │ Zero<T>       │
//!  │ atomic counts │◄───────│ sums Direct<S> via  │        │ always 0      │
//!  └───────────────┘ source │ TranslationTable    │        └───────────────┘
//!                           └─────────────────────┘
//! ```
//!
//! Which variant a reader gets is decided at registration time: translated
//! when the underlying direct statistic exists, zero when it does not.

pub mod direct;
pub mod translated;
pub mod zero;

use std::sync::Arc;

use crate::outcome::Outcome;

pub use direct::DirectStatistic;
pub use translated::{TranslatedStatistic, TranslationTable, translate};
pub use zero::ZeroStatistic;

/// Well-known statistic names shared by observers, tiers and views.
pub mod names {
    pub const GET: &str = "get";
    pub const PUT: &str = "put";
    pub const REMOVE: &str = "remove";
    pub const CLEAR: &str = "clear";
    pub const EVICTION: &str = "eviction";
    pub const EXPIRATION: &str = "expiration";
    /// Pass-through gauge with a tier's current entry count.
    pub const MAPPINGS: &str = "mappings";
}

/// Read-side view over outcome counts keyed by `T`.
///
/// Reads never fail.
pub trait OperationStatistic<T: Outcome>: Send + Sync {
    /// Number of operations that ended in `outcome`.
    fn count(&self, outcome: T) -> u64;

    /// Sum of the counts of `outcomes`.
    fn sum_of(&self, outcomes: &[T]) -> u64 {
        outcomes.iter().map(|&outcome| self.count(outcome)).sum()
    }

    /// Sum over every outcome of `T`.
    fn sum(&self) -> u64 {
        self.sum_of(T::ALL)
    }
}

/// Shared, type-erased handle to any statistic variant.
pub type SharedStatistic<T> = Arc<dyn OperationStatistic<T>>;

impl<T: Outcome, S: OperationStatistic<T> + ?Sized> OperationStatistic<T> for Arc<S> {
    #[inline]
    fn count(&self, outcome: T) -> u64 {
        (**self).count(outcome)
    }

    fn sum_of(&self, outcomes: &[T]) -> u64 {
        (**self).sum_of(outcomes)
    }

    fn sum(&self) -> u64 {
        (**self).sum()
    }
}
