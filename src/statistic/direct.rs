//! Counter-backed statistic written by an [`OperationObserver`](crate::observer::OperationObserver).
//!
//! ## Implementation Notes
//! - One `AtomicU64` per outcome, indexed by [`Outcome::ordinal`].
//! - Counters use `Relaxed` ordering; statistics are observational and never
//!   order other memory operations.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::outcome::Outcome;
use crate::statistic::OperationStatistic;

/// Direct statistic: real counters for every outcome of `T`.
pub struct DirectStatistic<T: Outcome> {
    name: String,
    counts: Box<[AtomicU64]>,
    _outcome: PhantomData<fn() -> T>,
}

impl<T: Outcome> DirectStatistic<T> {
    /// Creates a statistic with every counter at zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counts: T::ALL.iter().map(|_| AtomicU64::new(0)).collect(),
            _outcome: PhantomData,
        }
    }

    /// Name this statistic was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increments the counter for `outcome`.
    #[inline]
    pub fn record(&self, outcome: T) {
        self.counts[outcome.ordinal()].fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `n` to the counter for `outcome`.
    #[inline]
    pub fn record_n(&self, outcome: T, n: u64) {
        self.counts[outcome.ordinal()].fetch_add(n, Ordering::Relaxed);
    }

    /// Current count of every outcome, in [`Outcome::ALL`] order.
    pub fn counts(&self) -> Vec<(T, u64)> {
        T::ALL
            .iter()
            .map(|&outcome| (outcome, self.count(outcome)))
            .collect()
    }
}

impl<T: Outcome> OperationStatistic<T> for DirectStatistic<T> {
    #[inline]
    fn count(&self, outcome: T) -> u64 {
        self.counts[outcome.ordinal()].load(Ordering::Relaxed)
    }
}

impl<T: Outcome> fmt::Debug for DirectStatistic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (outcome, count) in self.counts() {
            map.entry(&outcome.name(), &count);
        }
        map.finish()
    }
}
