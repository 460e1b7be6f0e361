//! Outcome enumerations.
//!
//! Every operation recorded by a cache or one of its tiers ends in exactly one
//! outcome drawn from a closed enumeration. Enumerations at different levels
//! never mix; [`TranslationTable`](crate::statistic::translated::TranslationTable)
//! is the only bridge between them.
//!
//! ## Architecture
//!
//! ```text
//!   store::GetOutcome {Hit, Miss, Timeout}      (emitted by a store/tier)
//!            │
//!            │  tier::get_translation()
//!            ▼
//!   tier::GetOutcome {Hit ← [Hit], Miss ← [Miss, Timeout]}
//!
//!   cache::GetOutcome {Hit, Miss, Failure}      (emitted by the cache itself)
//! ```
//!
//! ## Declaring an enumeration
//!
//! ```
//! use tierstats::outcome::Outcome;
//! use tierstats::outcome_enum;
//!
//! outcome_enum! {
//!     /// Outcome of a bulk load.
//!     pub enum LoadOutcome {
//!         Loaded => "loaded",
//!         Skipped => "skipped",
//!     }
//! }
//!
//! assert_eq!(LoadOutcome::ALL, &[LoadOutcome::Loaded, LoadOutcome::Skipped]);
//! assert_eq!(LoadOutcome::Skipped.ordinal(), 1);
//! assert_eq!(LoadOutcome::Loaded.name(), "loaded");
//! ```

use std::fmt::Debug;
use std::hash::Hash;

/// A closed, exhaustive enumeration of operation outcomes.
///
/// `ordinal()` must be a dense index into [`Outcome::ALL`]; counters are
/// stored in arrays indexed by it.
pub trait Outcome: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    /// Position of this variant in [`Outcome::ALL`].
    fn ordinal(self) -> usize;

    /// Stable lowercase label, used in exported metric names.
    fn name(self) -> &'static str;
}

/// Declares a field-less enum and implements [`Outcome`] for it.
#[macro_export]
macro_rules! outcome_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::outcome::Outcome for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            #[inline]
            fn ordinal(self) -> usize {
                self as usize
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

/// Outcomes recorded by the cache facade itself.
pub mod cache {
    crate::outcome_enum! {
        /// Result of a cache `get`.
        pub enum GetOutcome {
            Hit => "hit",
            Miss => "miss",
            Failure => "failure",
        }
    }

    crate::outcome_enum! {
        /// Result of a cache `put`.
        pub enum PutOutcome {
            Put => "put",
            Noop => "noop",
            Failure => "failure",
        }
    }

    crate::outcome_enum! {
        /// Result of a cache `remove`.
        pub enum RemoveOutcome {
            Success => "success",
            Noop => "noop",
            Failure => "failure",
        }
    }

    crate::outcome_enum! {
        /// Result of a cache `clear`.
        pub enum ClearOutcome {
            Success => "success",
            Failure => "failure",
        }
    }
}

/// Raw outcomes emitted by store (tier) implementations.
pub mod store {
    crate::outcome_enum! {
        /// Result of a store lookup.
        pub enum GetOutcome {
            Hit => "hit",
            Miss => "miss",
            Timeout => "timeout",
        }
    }

    crate::outcome_enum! {
        /// Result of a store write.
        pub enum PutOutcome {
            Put => "put",
            Replaced => "replaced",
            Noop => "noop",
        }
    }

    crate::outcome_enum! {
        /// Result of a store removal.
        pub enum RemoveOutcome {
            Removed => "removed",
            Missing => "missing",
        }
    }

    crate::outcome_enum! {
        /// Result of an eviction attempt.
        pub enum EvictionOutcome {
            Success => "success",
            Failure => "failure",
        }
    }

    crate::outcome_enum! {
        /// Result of an expiration attempt.
        pub enum ExpirationOutcome {
            Success => "success",
            Failure => "failure",
        }
    }
}

/// Unified per-tier outcomes, and the standard tables translating
/// [`store`] outcomes into them.
pub mod tier {
    use super::store;
    use crate::statistic::translated::TranslationTable;

    crate::outcome_enum! {
        /// Tier lookup result as seen by statistics readers.
        pub enum GetOutcome {
            Hit => "hit",
            Miss => "miss",
        }
    }

    crate::outcome_enum! {
        /// Tier write result.
        pub enum PutOutcome {
            Put => "put",
            Noop => "noop",
        }
    }

    crate::outcome_enum! {
        /// Tier removal result.
        pub enum RemovalOutcome {
            Removed => "removed",
            Missing => "missing",
        }
    }

    crate::outcome_enum! {
        /// Tier eviction result.
        pub enum EvictionOutcome {
            Success => "success",
            Failure => "failure",
        }
    }

    crate::outcome_enum! {
        /// Tier expiration result.
        pub enum ExpirationOutcome {
            Success => "success",
            Failure => "failure",
        }
    }

    /// Timeouts are reported as misses.
    pub fn get_translation() -> TranslationTable<GetOutcome, store::GetOutcome> {
        TranslationTable::builder()
            .map(GetOutcome::Hit, [store::GetOutcome::Hit])
            .map(
                GetOutcome::Miss,
                [store::GetOutcome::Miss, store::GetOutcome::Timeout],
            )
            .build()
    }

    /// Replacements are reported as puts.
    pub fn put_translation() -> TranslationTable<PutOutcome, store::PutOutcome> {
        TranslationTable::builder()
            .map(
                PutOutcome::Put,
                [store::PutOutcome::Put, store::PutOutcome::Replaced],
            )
            .map(PutOutcome::Noop, [store::PutOutcome::Noop])
            .build()
    }

    pub fn removal_translation() -> TranslationTable<RemovalOutcome, store::RemoveOutcome> {
        TranslationTable::builder()
            .map(RemovalOutcome::Removed, [store::RemoveOutcome::Removed])
            .map(RemovalOutcome::Missing, [store::RemoveOutcome::Missing])
            .build()
    }

    pub fn eviction_translation() -> TranslationTable<EvictionOutcome, store::EvictionOutcome> {
        TranslationTable::builder()
            .map(EvictionOutcome::Success, [store::EvictionOutcome::Success])
            .map(EvictionOutcome::Failure, [store::EvictionOutcome::Failure])
            .build()
    }

    pub fn expiration_translation()
    -> TranslationTable<ExpirationOutcome, store::ExpirationOutcome> {
        TranslationTable::builder()
            .map(
                ExpirationOutcome::Success,
                [store::ExpirationOutcome::Success],
            )
            .map(
                ExpirationOutcome::Failure,
                [store::ExpirationOutcome::Failure],
            )
            .build()
    }
}
