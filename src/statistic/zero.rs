//! Fallback statistic for a store/tier combination that records nothing.
//!
//! Handed out when the direct statistic a translation would read from was
//! never registered, e.g. because the tier is not configured for the cache.
//! Zero-sized and stateless, so every copy is interchangeable.
//! [`ZeroStatistic::shared`] still hands out one instance per outcome type.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::outcome::Outcome;
use crate::statistic::{OperationStatistic, SharedStatistic};

/// Statistic that answers every query with zero.
///
/// # Example
///
/// ```
/// use tierstats::outcome::tier::GetOutcome;
/// use tierstats::statistic::{OperationStatistic, ZeroStatistic};
///
/// let zero = ZeroStatistic::<GetOutcome>::new();
/// assert_eq!(zero.count(GetOutcome::Hit), 0);
/// assert_eq!(zero.sum(), 0);
/// ```
pub struct ZeroStatistic<T: Outcome>(PhantomData<fn() -> T>);

impl<T: Outcome> ZeroStatistic<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }

    /// The process-wide shared handle for outcome type `T`.
    ///
    /// Every call for the same `T` returns the same instance.
    pub fn shared() -> SharedStatistic<T> {
        let instances = SHARED_ZEROS.get_or_init(Default::default);
        let key = TypeId::of::<T>();
        if let Some(found) = instances.read().get(&key).and_then(|slot| downcast::<T>(&**slot)) {
            return found;
        }
        let mut instances = instances.write();
        let slot = instances.entry(key).or_insert_with(|| {
            let zero: SharedStatistic<T> = Arc::new(Self::new());
            let boxed: Box<dyn Any + Send + Sync> = Box::new(zero);
            boxed
        });
        downcast::<T>(&**slot).unwrap_or_else(|| Arc::new(Self::new()))
    }
}

type ZeroInstances = RwLock<FxHashMap<TypeId, Box<dyn Any + Send + Sync>>>;

// one `SharedStatistic<T>` per outcome type, keyed by `TypeId::of::<T>()`
static SHARED_ZEROS: OnceLock<ZeroInstances> = OnceLock::new();

fn downcast<T: Outcome>(slot: &(dyn Any + Send + Sync)) -> Option<SharedStatistic<T>> {
    slot.downcast_ref::<SharedStatistic<T>>().map(Arc::clone)
}

impl<T: Outcome> OperationStatistic<T> for ZeroStatistic<T> {
    #[inline]
    fn count(&self, _outcome: T) -> u64 {
        0
    }

    #[inline]
    fn sum_of(&self, _outcomes: &[T]) -> u64 {
        0
    }

    #[inline]
    fn sum(&self) -> u64 {
        0
    }
}

impl<T: Outcome> Default for ZeroStatistic<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Outcome> Clone for ZeroStatistic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Outcome> Copy for ZeroStatistic<T> {}

impl<T: Outcome> fmt::Debug for ZeroStatistic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ZeroStatistic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::store::{EvictionOutcome, GetOutcome};

    #[test]
    fn zero_sized() {
        assert_eq!(std::mem::size_of::<ZeroStatistic<GetOutcome>>(), 0);
    }

    #[test]
    fn shared_handle_reads_zero() {
        let stat = ZeroStatistic::<EvictionOutcome>::shared();
        assert_eq!(stat.count(EvictionOutcome::Success), 0);
        assert_eq!(stat.sum(), 0);
    }

    #[test]
    fn shared_is_one_instance_per_outcome_type() {
        let a = ZeroStatistic::<GetOutcome>::shared();
        let b = ZeroStatistic::<GetOutcome>::shared();
        assert!(Arc::ptr_eq(&a, &b));

        let other = ZeroStatistic::<EvictionOutcome>::shared();
        assert_eq!(other.sum(), 0);
        assert!(Arc::ptr_eq(&other, &ZeroStatistic::<EvictionOutcome>::shared()));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_query_is_zero(picks in prop::collection::vec(0usize..3, 0..64)) {
                let zero = ZeroStatistic::<GetOutcome>::new();
                let outcomes: Vec<GetOutcome> =
                    picks.iter().map(|&i| GetOutcome::ALL[i]).collect();
                for &outcome in &outcomes {
                    prop_assert_eq!(zero.count(outcome), 0);
                }
                prop_assert_eq!(zero.sum_of(&outcomes), 0);
                prop_assert_eq!(zero.sum(), 0);
            }
        }
    }
}
