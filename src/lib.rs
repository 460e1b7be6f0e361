//! tierstats: statistics aggregation and lifecycle binding for multi-tier
//! caches.
//!
//! Stores record operation outcomes through observers, the statistics tree
//! links those counters to the stores and caches they belong to, and the
//! lifecycle manager keeps one statistics view per live cache alias.
//!
//! See `DESIGN.md` for the module map and design decisions.

pub mod builder;
pub mod ds;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod observer;
pub mod outcome;
pub mod pass_through;
pub mod prelude;
pub mod statistic;
pub mod tree;
pub mod view;
