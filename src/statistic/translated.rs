//! Outcome translation: reading a statistic of one outcome type through
//! another.
//!
//! ## Architecture
//!
//! ```text
//!   TranslationTable<O, S>                 source: Direct<S>
//!   ┌──────────────────────────────┐       ┌──────────────────────┐
//!   │ O::Hit  → [S::Hit]           │       │ S::Hit      12       │
//!   │ O::Miss → [S::Miss, S::Tmo]  │       │ S::Miss      3       │
//!   └──────────────┬───────────────┘       │ S::Tmo       1       │
//!                  │                       └──────────┬───────────┘
//!                  └──────────────┬───────────────────┘
//!                                 ▼
//!                   Translated<O, S>: count(O::Miss) = 3 + 1
//! ```
//!
//! ## Key Components
//! - [`TranslationTable`]: immutable map from a target outcome to the source
//!   outcomes summed into it. Both outcome types are explicit type
//!   parameters; nothing is inferred from the table's contents.
//! - [`translate`]: validates a table and wraps a source statistic.
//! - [`TranslatedStatistic`]: the resulting read-side view.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use tierstats::outcome::{store, tier};
//! use tierstats::statistic::{DirectStatistic, OperationStatistic, translate};
//!
//! let source = Arc::new(DirectStatistic::<store::GetOutcome>::new("get"));
//! source.record(store::GetOutcome::Miss);
//! source.record(store::GetOutcome::Timeout);
//!
//! let table = tier::get_translation();
//! let translated = translate(&table, source.clone()).unwrap();
//! assert_eq!(translated.count(tier::GetOutcome::Miss), 2);
//! assert_eq!(translated.count(tier::GetOutcome::Hit), 0);
//! ```

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ConfigError;
use crate::outcome::Outcome;
use crate::statistic::{OperationStatistic, SharedStatistic};

// ---------------------------------------------------------------------------
// TranslationTable
// ---------------------------------------------------------------------------

/// Mapping from target outcome `O` to the source outcomes `S` summed into it.
///
/// Construction never fails; [`validate`](Self::validate) checks the table
/// is usable. Duplicate source outcomes inside one bucket are collapsed.
#[derive(Clone, PartialEq, Eq)]
pub struct TranslationTable<O: Outcome, S: Outcome> {
    buckets: FxHashMap<O, Box<[S]>>,
}

impl<O: Outcome, S: Outcome> TranslationTable<O, S> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            buckets: FxHashMap::default(),
        }
    }

    pub fn builder() -> TranslationTableBuilder<O, S> {
        TranslationTableBuilder { table: Self::new() }
    }

    /// Source outcomes summed into `outcome`; empty when unmapped.
    pub fn sources(&self, outcome: O) -> &[S] {
        match self.buckets.get(&outcome) {
            Some(bucket) => bucket,
            None => &[],
        }
    }

    /// Number of mapped target outcomes.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Iterates `(target, sources)` pairs in target declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (O, &[S])> + '_ {
        O::ALL
            .iter()
            .filter_map(|&target| self.buckets.get(&target).map(|b| (target, &b[..])))
    }

    /// Checks the table is non-empty, every bucket is non-empty, and no
    /// source outcome is counted under two targets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets.is_empty() {
            return Err(ConfigError::new("translation table is empty"));
        }

        let mut seen: FxHashMap<S, O> = FxHashMap::default();
        for (target, sources) in self.iter() {
            if sources.is_empty() {
                return Err(ConfigError::new(format!(
                    "translation bucket {:?} has no source outcomes",
                    target
                )));
            }
            for &source in sources {
                if let Some(previous) = seen.insert(source, target) {
                    return Err(ConfigError::new(format!(
                        "source outcome {:?} is mapped to both {:?} and {:?}",
                        source, previous, target
                    )));
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, target: O, sources: impl IntoIterator<Item = S>) {
        let mut unique = FxHashSet::default();
        let bucket: Vec<S> = sources
            .into_iter()
            .filter(|source| unique.insert(*source))
            .collect();
        self.buckets.insert(target, bucket.into_boxed_slice());
    }
}

impl<O: Outcome, S: Outcome> Default for TranslationTable<O, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, S, I> FromIterator<(O, I)> for TranslationTable<O, S>
where
    O: Outcome,
    S: Outcome,
    I: IntoIterator<Item = S>,
{
    /// Later entries for the same target replace earlier ones.
    fn from_iter<T: IntoIterator<Item = (O, I)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (target, sources) in iter {
            table.insert(target, sources);
        }
        table
    }
}

impl<O: Outcome, S: Outcome> fmt::Debug for TranslationTable<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Builder for [`TranslationTable`].
#[derive(Debug)]
pub struct TranslationTableBuilder<O: Outcome, S: Outcome> {
    table: TranslationTable<O, S>,
}

impl<O: Outcome, S: Outcome> TranslationTableBuilder<O, S> {
    /// Maps `target` to `sources`, replacing any previous mapping.
    pub fn map(mut self, target: O, sources: impl IntoIterator<Item = S>) -> Self {
        self.table.insert(target, sources);
        self
    }

    pub fn build(self) -> TranslationTable<O, S> {
        self.table
    }
}

// ---------------------------------------------------------------------------
// TranslatedStatistic
// ---------------------------------------------------------------------------

/// Statistic keyed by `O`, aggregated from a source statistic keyed by `S`.
pub struct TranslatedStatistic<O: Outcome, S: Outcome> {
    table: TranslationTable<O, S>,
    source: SharedStatistic<S>,
}

impl<O: Outcome, S: Outcome> TranslatedStatistic<O, S> {
    pub fn table(&self) -> &TranslationTable<O, S> {
        &self.table
    }

    /// The statistic this one reads from.
    pub fn source(&self) -> &SharedStatistic<S> {
        &self.source
    }
}

impl<O: Outcome, S: Outcome> OperationStatistic<O> for TranslatedStatistic<O, S> {
    fn count(&self, outcome: O) -> u64 {
        self.source.sum_of(self.table.sources(outcome))
    }
}

impl<O: Outcome, S: Outcome> fmt::Debug for TranslatedStatistic<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for &outcome in O::ALL {
            map.entry(&outcome.name(), &self.count(outcome));
        }
        map.finish()
    }
}

/// Wraps `source` so it is read through `table`.
///
/// # Errors
///
/// Returns [`ConfigError`] when `table` fails [`TranslationTable::validate`].
pub fn translate<O: Outcome, S: Outcome>(
    table: &TranslationTable<O, S>,
    source: SharedStatistic<S>,
) -> Result<TranslatedStatistic<O, S>, ConfigError> {
    table.validate()?;
    Ok(TranslatedStatistic {
        table: table.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::outcome::{store, tier};
    use crate::statistic::{DirectStatistic, ZeroStatistic};

    fn recorded(hits: u64, misses: u64, timeouts: u64) -> Arc<DirectStatistic<store::GetOutcome>> {
        let stat = Arc::new(DirectStatistic::new("get"));
        stat.record_n(store::GetOutcome::Hit, hits);
        stat.record_n(store::GetOutcome::Miss, misses);
        stat.record_n(store::GetOutcome::Timeout, timeouts);
        stat
    }

    // -- TranslationTable -------------------------------------------------

    #[test]
    fn empty_table_is_rejected() {
        let table: TranslationTable<tier::GetOutcome, store::GetOutcome> = TranslationTable::new();
        let err = table.validate().unwrap_err();
        assert!(err.message().contains("empty"));
    }

    #[test]
    fn empty_bucket_is_rejected() {
        let table = TranslationTable::builder()
            .map(tier::GetOutcome::Hit, [store::GetOutcome::Hit])
            .map(tier::GetOutcome::Miss, [] as [store::GetOutcome; 0])
            .build();
        let err = table.validate().unwrap_err();
        assert!(err.message().contains("no source outcomes"));
    }

    #[test]
    fn overlapping_buckets_are_rejected() {
        let table = TranslationTable::builder()
            .map(tier::GetOutcome::Hit, [store::GetOutcome::Hit])
            .map(
                tier::GetOutcome::Miss,
                [store::GetOutcome::Miss, store::GetOutcome::Hit],
            )
            .build();
        let err = table.validate().unwrap_err();
        assert!(err.message().contains("mapped to both"));
    }

    #[test]
    fn duplicate_sources_within_a_bucket_collapse() {
        let table = TranslationTable::builder()
            .map(
                tier::GetOutcome::Hit,
                [store::GetOutcome::Hit, store::GetOutcome::Hit],
            )
            .build();
        assert_eq!(table.sources(tier::GetOutcome::Hit), &[store::GetOutcome::Hit]);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn from_iterator_builds_the_same_table() {
        let collected: TranslationTable<_, _> = [
            (tier::GetOutcome::Hit, vec![store::GetOutcome::Hit]),
            (
                tier::GetOutcome::Miss,
                vec![store::GetOutcome::Miss, store::GetOutcome::Timeout],
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(collected, tier::get_translation());
    }

    #[test]
    fn iter_follows_declaration_order() {
        let table = tier::get_translation();
        let targets: Vec<_> = table.iter().map(|(target, _)| target).collect();
        assert_eq!(targets, vec![tier::GetOutcome::Hit, tier::GetOutcome::Miss]);
    }

    // -- translate --------------------------------------------------------

    #[test]
    fn translate_sums_mapped_sources() {
        let source = recorded(5, 2, 3);
        let translated = translate(&tier::get_translation(), source).unwrap();

        assert_eq!(translated.count(tier::GetOutcome::Hit), 5);
        assert_eq!(translated.count(tier::GetOutcome::Miss), 5);
        assert_eq!(translated.sum(), 10);
    }

    #[test]
    fn translate_reads_live_counts() {
        let source = recorded(0, 0, 0);
        let translated = translate(&tier::get_translation(), source.clone()).unwrap();
        assert_eq!(translated.count(tier::GetOutcome::Hit), 0);

        source.record(store::GetOutcome::Hit);
        assert_eq!(translated.count(tier::GetOutcome::Hit), 1);
    }

    #[test]
    fn unmapped_target_counts_zero() {
        let table = TranslationTable::builder()
            .map(tier::GetOutcome::Hit, [store::GetOutcome::Hit])
            .build();
        let translated = translate(&table, recorded(4, 4, 4)).unwrap();
        assert_eq!(translated.count(tier::GetOutcome::Miss), 0);
        assert_eq!(translated.sum(), 4);
    }

    #[test]
    fn translate_rejects_empty_table() {
        let table: TranslationTable<tier::GetOutcome, store::GetOutcome> = TranslationTable::new();
        assert!(translate(&table, ZeroStatistic::shared()).is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn translated_count_is_sum_of_mapped_source_counts(
                counts in prop::collection::vec(0u64..10_000, 3),
                assignment in prop::collection::vec(prop::option::of(0usize..2), 3),
            ) {
                let source = recorded(counts[0], counts[1], counts[2]);

                let mut builder = TranslationTable::builder();
                for &target in tier::GetOutcome::ALL {
                    let sources: Vec<store::GetOutcome> = store::GetOutcome::ALL
                        .iter()
                        .zip(&assignment)
                        .filter(|(_, slot)| **slot == Some(target.ordinal()))
                        .map(|(source, _)| *source)
                        .collect();
                    if !sources.is_empty() {
                        builder = builder.map(target, sources);
                    }
                }
                let table = builder.build();
                prop_assume!(!table.is_empty());

                let translated = translate(&table, source.clone()).unwrap();
                for &target in tier::GetOutcome::ALL {
                    let expected: u64 = table
                        .sources(target)
                        .iter()
                        .map(|&s| source.count(s))
                        .sum();
                    prop_assert_eq!(translated.count(target), expected);
                }
            }
        }
    }
}
