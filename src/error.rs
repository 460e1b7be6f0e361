//! Error types for the tierstats library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when a collaborator wires a statistic
//!   incorrectly (empty or overlapping translation table, untranslatable
//!   statistic type, zero tree shards). Never retryable.
//! - [`UnknownCacheError`]: Returned when statistics are requested for an
//!   alias that has no live view. The only error a statistics reader sees.
//! - [`LifecycleError`]: Returned when the statistics service is driven
//!   through an illegal lifecycle transition.
//!
//! ## Example Usage
//!
//! ```
//! use tierstats::error::ConfigError;
//! use tierstats::outcome::{store, tier};
//! use tierstats::statistic::translated::TranslationTable;
//!
//! let empty: TranslationTable<tier::GetOutcome, store::GetOutcome> = TranslationTable::new();
//! let err: ConfigError = empty.validate().unwrap_err();
//! assert!(err.message().contains("empty"));
//! ```

use thiserror::Error;

use crate::lifecycle::LifecycleState;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when statistic registration parameters are invalid.
///
/// Produced at registration time, before any tree mutation, by
/// [`translate`](crate::statistic::translated::translate),
/// [`OperationObserverFactory::register_store_statistic`](crate::observer::OperationObserverFactory::register_store_statistic),
/// [`PassThroughStatisticRegistry::register`](crate::pass_through::PassThroughStatisticRegistry::register)
/// and [`StatisticsServiceBuilder::try_build`](crate::builder::StatisticsServiceBuilder::try_build).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// UnknownCacheError
// ---------------------------------------------------------------------------

/// Error returned when no statistics view exists for a cache alias.
///
/// # Example
///
/// ```
/// use tierstats::lifecycle::CacheLifecycleManager;
///
/// let manager = CacheLifecycleManager::new();
/// let err = manager.cache_statistics("orders").unwrap_err();
/// assert_eq!(err.alias(), "orders");
/// assert_eq!(err.to_string(), "unknown cache: orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cache: {alias}")]
pub struct UnknownCacheError {
    alias: String,
}

impl UnknownCacheError {
    /// Creates an error for `alias`.
    #[inline]
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }

    /// Returns the alias that was looked up.
    #[inline]
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

// ---------------------------------------------------------------------------
// LifecycleError
// ---------------------------------------------------------------------------

/// Error returned when the statistics service sees an illegal lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The owning registry is (or moved) into maintenance mode.
    #[error("statistics service must not run in maintenance mode (transition from {from})")]
    Maintenance { from: LifecycleState },

    /// `start` was called while already bound to a registry.
    #[error("statistics service is already started")]
    AlreadyStarted,

    /// A transition that needs the owning registry arrived before `start`.
    #[error("statistics service is not started")]
    NotStarted,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
