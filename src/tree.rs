//! Statistics tree: parent/child associations between statistic contexts.
//!
//! Caches, stores and tiers are *context* nodes; observer counters,
//! translated statistics and pass-through values are *statistic* nodes
//! hanging below them. Readers discover statistics by walking down from a
//! context; teardown code detaches a whole subtree with [`clean`].
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ StatisticTreeRegistry                                            │
//!   │                                                                  │
//!   │   ShardSelector(NodeKey) ──► shard i                             │
//!   │                                                                  │
//!   │   ┌──────────────┬──────────────┬──────────────┬──────────────┐  │
//!   │   │ RwLock<Map>  │ RwLock<Map>  │ RwLock<Map>  │ RwLock<Map>  │  │
//!   │   │ key → entry  │ key → entry  │ key → entry  │ key → entry  │  │
//!   │   └──────────────┴──────────────┴──────────────┴──────────────┘  │
//!   │                                                                  │
//!   │   entry = { liveness, parents, children, statistic record? }     │
//!   └──────────────────────────────────────────────────────────────────┘
//!
//!   cache ──► store(OnHeap) ──► Direct<store::GetOutcome> "get"
//!     │             └─────────► Translated<tier::GetOutcome> "get" [OnHeap]
//!     └────► Direct<cache::GetOutcome> "get"
//! ```
//!
//! ## Key Concepts
//!
//! - **Identity, not value**: a node is the `Arc` it lives in
//!   ([`NodeKey::of`]). Context nodes are tracked through a `Weak` handle and
//!   are never kept alive by the tree.
//! - **Edge atomicity**: both halves of an edge are written under the locks
//!   of both shards involved, taken in ascending shard order. There is no
//!   global lock; operations on disjoint shards never contend.
//! - **Garbage**: an entry that loses its last edge is dropped. [`clean`]
//!   additionally cleans every child left without a parent.
//!
//! [`clean`]: StatisticTreeRegistry::clean
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use tierstats::tree::{NodeKey, StatisticTreeRegistry};
//!
//! let tree = StatisticTreeRegistry::new(8, 0);
//! let cache = Arc::new("cache");
//! let store = Arc::new("store");
//!
//! tree.associate(&store, &cache);
//! assert!(tree.is_associated(&store, &cache));
//! assert_eq!(tree.children(&cache), vec![NodeKey::of(&store)]);
//!
//! tree.clean(&cache);
//! assert!(!tree.contains(&store));
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ds::ShardSelector;

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

/// Identity of a node: the address of the `Arc` allocation it lives in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(usize);

impl NodeKey {
    /// Key of the value behind `node`. Clones of one `Arc` share a key.
    #[inline]
    pub fn of<C: ?Sized>(node: &Arc<C>) -> Self {
        Self(Arc::as_ptr(node).cast::<()>() as usize)
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({:#x})", self.0)
    }
}

/// Answers whether the owner of a context node still exists.
///
/// Holds the owner weakly; once it answers false it never answers true again.
pub(crate) type LivenessCheck = Arc<dyn Fn() -> bool + Send + Sync>;

pub(crate) fn liveness_check<C: ?Sized + Send + Sync + 'static>(node: &Arc<C>) -> LivenessCheck {
    let weak = Arc::downgrade(node);
    Arc::new(move || weak.strong_count() > 0)
}

/// How the tree decides whether a node's owner still exists.
enum Liveness {
    /// External context; alive while its owner holds a strong reference.
    Context(LivenessCheck),
    /// Statistic owned by the tree itself.
    Owned,
}

impl Liveness {
    fn of<C: ?Sized + Send + Sync + 'static>(node: &Arc<C>) -> Self {
        Liveness::Context(liveness_check(node))
    }

    fn is_alive(&self) -> bool {
        match self {
            Liveness::Context(alive) => alive(),
            Liveness::Owned => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Statistic records
// ---------------------------------------------------------------------------

/// Where a registered statistic's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticOrigin {
    /// Counters written by an operation observer.
    Direct,
    /// A direct statistic read through a translation table.
    Translated,
    /// A value computed on demand by a supplier.
    PassThrough,
}

/// Discovery metadata attached to a statistic node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticDescriptor {
    pub name: String,
    pub origin: StatisticOrigin,
    pub tags: Vec<String>,
    /// Position of the owning tier in the cache hierarchy, when tier-scoped.
    pub tier_height: Option<i32>,
}

impl StatisticDescriptor {
    pub fn new(name: impl Into<String>, origin: StatisticOrigin) -> Self {
        Self {
            name: name.into(),
            origin,
            tags: Vec::new(),
            tier_height: None,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_tier_height(mut self, tier_height: i32) -> Self {
        self.tier_height = Some(tier_height);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

struct StatisticRecord {
    descriptor: StatisticDescriptor,
    payload: Arc<dyn Any + Send + Sync>,
}

/// Filter for [`StatisticTreeRegistry::find_statistics`].
#[derive(Debug, Clone, Default)]
pub struct StatisticQuery {
    name: Option<String>,
    tag: Option<String>,
    origin: Option<StatisticOrigin>,
    children_only: bool,
}

impl StatisticQuery {
    /// Matches every statistic among all descendants.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::any().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn origin(mut self, origin: StatisticOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Restricts the search to direct children of the root.
    pub fn children_only(mut self) -> Self {
        self.children_only = true;
        self
    }

    fn matches(&self, descriptor: &StatisticDescriptor) -> bool {
        self.name.as_deref().is_none_or(|n| descriptor.name == n)
            && self.tag.as_deref().is_none_or(|t| descriptor.has_tag(t))
            && self.origin.is_none_or(|o| descriptor.origin == o)
    }
}

/// A statistic found by [`StatisticTreeRegistry::find_statistics`].
#[derive(Debug)]
pub struct Discovered<P> {
    pub descriptor: StatisticDescriptor,
    /// Node the statistic hangs under.
    pub owner: NodeKey,
    pub statistic: Arc<P>,
}

// ---------------------------------------------------------------------------
// Entries and shards
// ---------------------------------------------------------------------------

struct NodeEntry {
    liveness: Liveness,
    parents: FxHashSet<NodeKey>,
    children: FxHashSet<NodeKey>,
    statistic: Option<StatisticRecord>,
}

impl NodeEntry {
    fn new(liveness: Liveness) -> Self {
        Self {
            liveness,
            parents: FxHashSet::default(),
            children: FxHashSet::default(),
            statistic: None,
        }
    }

    fn is_isolated(&self) -> bool {
        self.parents.is_empty() && self.children.is_empty()
    }
}

type Shard = FxHashMap<NodeKey, NodeEntry>;

/// Write guards over the shards of an edge's two endpoints.
///
/// `left` always holds the child's shard; `right` is `None` when both
/// endpoints share a shard.
struct EdgeGuard<'a> {
    left: RwLockWriteGuard<'a, Shard>,
    right: Option<RwLockWriteGuard<'a, Shard>>,
}

impl EdgeGuard<'_> {
    fn child(&mut self) -> &mut Shard {
        &mut self.left
    }

    fn parent(&mut self) -> &mut Shard {
        match &mut self.right {
            Some(guard) => guard,
            None => &mut self.left,
        }
    }
}

// ---------------------------------------------------------------------------
// StatisticTreeRegistry
// ---------------------------------------------------------------------------

/// Sharded registry of parent/child associations between statistic nodes.
pub struct StatisticTreeRegistry {
    shards: Box<[RwLock<Shard>]>,
    selector: ShardSelector,
}

impl StatisticTreeRegistry {
    /// Creates a registry with `shards` lock shards (clamped to at least 1).
    pub fn new(shards: usize, seed: u64) -> Self {
        let selector = ShardSelector::new(shards, seed);
        let shards = (0..selector.shard_count())
            .map(|_| RwLock::new(Shard::default()))
            .collect();
        Self { shards, selector }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard_index(&self, key: NodeKey) -> usize {
        self.selector.shard_for_key(&key)
    }

    #[inline]
    fn shard(&self, key: NodeKey) -> &RwLock<Shard> {
        &self.shards[self.shard_index(key)]
    }

    fn lock_edge(&self, child: NodeKey, parent: NodeKey) -> EdgeGuard<'_> {
        let (ci, pi) = (self.shard_index(child), self.shard_index(parent));
        if ci == pi {
            return EdgeGuard {
                left: self.shards[ci].write(),
                right: None,
            };
        }
        if ci < pi {
            let left = self.shards[ci].write();
            let right = self.shards[pi].write();
            EdgeGuard {
                left,
                right: Some(right),
            }
        } else {
            let right = self.shards[pi].write();
            let left = self.shards[ci].write();
            EdgeGuard {
                left,
                right: Some(right),
            }
        }
    }

    /// Inserts the edge `child → parent`, creating entries on demand.
    fn link(
        &self,
        child: NodeKey,
        child_entry: impl FnOnce() -> NodeEntry,
        parent: NodeKey,
        parent_liveness: impl FnOnce() -> Liveness,
    ) -> bool {
        let mut guard = self.lock_edge(child, parent);
        let added = guard
            .child()
            .entry(child)
            .or_insert_with(child_entry)
            .parents
            .insert(parent);
        guard
            .parent()
            .entry(parent)
            .or_insert_with(|| NodeEntry::new(parent_liveness()))
            .children
            .insert(child);
        added
    }

    /// Removes the edge `child → parent`; drops endpoints left isolated.
    ///
    /// Returns `(removed, child_orphaned)`.
    fn unlink(&self, child: NodeKey, parent: NodeKey) -> (bool, bool) {
        let mut guard = self.lock_edge(child, parent);

        let mut removed = false;
        let mut orphaned = false;
        if let Some(entry) = guard.child().get_mut(&child) {
            removed = entry.parents.remove(&parent);
            orphaned = entry.parents.is_empty();
            if entry.is_isolated() {
                guard.child().remove(&child);
            }
        }
        if let Some(entry) = guard.parent().get_mut(&parent) {
            removed |= entry.children.remove(&child);
            if entry.is_isolated() {
                guard.parent().remove(&parent);
            }
        }
        (removed, orphaned)
    }

    // -- Associations -----------------------------------------------------

    /// Records that `node` is a child of `parent`.
    ///
    /// Idempotent. Returns `true` when the edge did not exist before.
    /// Self-association is refused.
    pub fn associate<N, P>(&self, node: &Arc<N>, parent: &Arc<P>) -> bool
    where
        N: ?Sized + Send + Sync + 'static,
        P: ?Sized + Send + Sync + 'static,
    {
        let (child, parent_key) = (NodeKey::of(node), NodeKey::of(parent));
        if child == parent_key {
            log::warn!("refusing to associate {:?} with itself", child);
            return false;
        }
        let added = self.link(
            child,
            || NodeEntry::new(Liveness::of(node)),
            parent_key,
            || Liveness::of(parent),
        );
        if added {
            log::trace!("associated {:?} under {:?}", child, parent_key);
        }
        added
    }

    /// Removes the edge between `node` and `parent` if present.
    ///
    /// Returns `true` when an edge was removed.
    pub fn dissociate<N, P>(&self, node: &Arc<N>, parent: &Arc<P>) -> bool
    where
        N: ?Sized,
        P: ?Sized,
    {
        let (child, parent_key) = (NodeKey::of(node), NodeKey::of(parent));
        let (removed, _) = self.unlink(child, parent_key);
        if removed {
            log::trace!("dissociated {:?} from {:?}", child, parent_key);
        }
        removed
    }

    /// Registers a tree-owned statistic node under `parent`.
    ///
    /// `key` identifies the statistic; `payload` is what
    /// [`find_statistics`](Self::find_statistics) hands back on discovery.
    pub(crate) fn attach_statistic<P>(
        &self,
        parent: &Arc<P>,
        key: NodeKey,
        descriptor: StatisticDescriptor,
        payload: Arc<dyn Any + Send + Sync>,
    ) where
        P: ?Sized + Send + Sync + 'static,
    {
        let parent_key = NodeKey::of(parent);
        let name = descriptor.name.clone();
        self.link(
            key,
            || NodeEntry {
                statistic: Some(StatisticRecord {
                    descriptor,
                    payload,
                }),
                ..NodeEntry::new(Liveness::Owned)
            },
            parent_key,
            || Liveness::of(parent),
        );
        log::trace!("attached statistic {:?} ({}) under {:?}", key, name, parent_key);
    }

    /// Removes `node` and every edge it takes part in, then cleans each
    /// child that was left without a parent.
    ///
    /// Cleaning a node that is not in the tree is a no-op.
    pub fn clean<N: ?Sized>(&self, node: &Arc<N>) -> usize {
        self.clean_key(NodeKey::of(node))
    }

    /// Same as [`clean`](Self::clean), by key. Returns the number of entries
    /// removed.
    pub fn clean_key(&self, root: NodeKey) -> usize {
        let mut removed = 0;
        let mut pending = vec![root];
        while let Some(key) = pending.pop() {
            if key != root && self.has_parents(key) {
                continue;
            }
            if self.detach(key, &mut pending) {
                removed += 1;
            }
        }
        if removed > 0 {
            log::trace!("cleaned {:?} ({} entries)", root, removed);
        }
        removed
    }

    /// Cuts every edge of `key` and removes its entry. Children left without
    /// a parent are pushed onto `orphans`.
    fn detach(&self, key: NodeKey, orphans: &mut Vec<NodeKey>) -> bool {
        loop {
            let (parents, children) = {
                let shard = self.shard(key).read();
                match shard.get(&key) {
                    None => return false,
                    Some(entry) => (
                        entry.parents.iter().copied().collect::<Vec<_>>(),
                        entry.children.iter().copied().collect::<Vec<_>>(),
                    ),
                }
            };

            if parents.is_empty() && children.is_empty() {
                let mut shard = self.shard(key).write();
                match shard.get(&key) {
                    None => return false,
                    Some(entry) if entry.is_isolated() => {
                        shard.remove(&key);
                        return true;
                    },
                    // Gained an edge concurrently; go around again.
                    Some(_) => continue,
                }
            }

            for parent in parents {
                let mut guard = self.lock_edge(key, parent);
                if let Some(entry) = guard.child().get_mut(&key) {
                    entry.parents.remove(&parent);
                }
                if let Some(entry) = guard.parent().get_mut(&parent) {
                    entry.children.remove(&key);
                    if entry.is_isolated() {
                        guard.parent().remove(&parent);
                    }
                }
            }

            for child in children {
                let mut guard = self.lock_edge(child, key);
                if let Some(entry) = guard.parent().get_mut(&key) {
                    entry.children.remove(&child);
                }
                if let Some(entry) = guard.child().get_mut(&child) {
                    entry.parents.remove(&key);
                    if entry.parents.is_empty() {
                        orphans.push(child);
                    }
                }
            }
        }
    }

    /// Cleans every context node whose owner has been dropped.
    ///
    /// Returns the number of entries removed, including orphaned statistics.
    pub fn purge(&self) -> usize {
        let dead: Vec<NodeKey> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .iter()
                    .filter(|(_, entry)| !entry.liveness.is_alive())
                    .map(|(key, _)| *key)
                    .collect::<Vec<_>>()
            })
            .collect();
        let removed = dead.into_iter().map(|key| self.clean_key(key)).sum();
        if removed > 0 {
            log::debug!("purged {} statistics tree entries", removed);
        }
        removed
    }

    // -- Queries ----------------------------------------------------------

    pub fn contains<N: ?Sized>(&self, node: &Arc<N>) -> bool {
        self.contains_key(NodeKey::of(node))
    }

    pub fn contains_key(&self, key: NodeKey) -> bool {
        self.shard(key).read().contains_key(&key)
    }

    /// Liveness check tied to the owner currently registered under `key`.
    ///
    /// `None` for statistic nodes and for keys not in the tree.
    pub(crate) fn liveness_of(&self, key: NodeKey) -> Option<LivenessCheck> {
        self.shard(key)
            .read()
            .get(&key)
            .and_then(|entry| match &entry.liveness {
                Liveness::Context(alive) => Some(Arc::clone(alive)),
                Liveness::Owned => None,
            })
    }

    /// `true` when `node` is currently a child of `parent`.
    pub fn is_associated<N: ?Sized, P: ?Sized>(&self, node: &Arc<N>, parent: &Arc<P>) -> bool {
        let (child, parent_key) = (NodeKey::of(node), NodeKey::of(parent));
        self.shard(child)
            .read()
            .get(&child)
            .is_some_and(|entry| entry.parents.contains(&parent_key))
    }

    /// Direct children of `node`, in key order.
    pub fn children<N: ?Sized>(&self, node: &Arc<N>) -> Vec<NodeKey> {
        self.children_of(NodeKey::of(node))
    }

    pub fn children_of(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut children: Vec<NodeKey> = self
            .shard(key)
            .read()
            .get(&key)
            .map(|entry| entry.children.iter().copied().collect())
            .unwrap_or_default();
        children.sort_unstable();
        children
    }

    /// Direct parents of `node`, in key order.
    pub fn parents<N: ?Sized>(&self, node: &Arc<N>) -> Vec<NodeKey> {
        self.parents_of(NodeKey::of(node))
    }

    pub fn parents_of(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut parents: Vec<NodeKey> = self
            .shard(key)
            .read()
            .get(&key)
            .map(|entry| entry.parents.iter().copied().collect())
            .unwrap_or_default();
        parents.sort_unstable();
        parents
    }

    fn has_parents(&self, key: NodeKey) -> bool {
        self.shard(key)
            .read()
            .get(&key)
            .is_some_and(|entry| !entry.parents.is_empty())
    }

    /// Total number of entries across all shards.
    pub fn node_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Statistics below `root` matching `query` whose payload is a `P`.
    ///
    /// Breadth-first; results are ordered by depth, then by key.
    pub fn find_statistics<N, P>(&self, root: &Arc<N>, query: &StatisticQuery) -> Vec<Discovered<P>>
    where
        N: ?Sized,
        P: Any + Send + Sync,
    {
        self.find_statistics_under(NodeKey::of(root), query)
    }

    pub fn find_statistics_under<P>(&self, root: NodeKey, query: &StatisticQuery) -> Vec<Discovered<P>>
    where
        P: Any + Send + Sync,
    {
        let mut found = Vec::new();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(root);
        queue.push_back(root);

        while let Some(owner) = queue.pop_front() {
            for child in self.children_of(owner) {
                if !visited.insert(child) {
                    continue;
                }
                if let Some((descriptor, payload)) = self.record_of(child) {
                    if query.matches(&descriptor) {
                        if let Ok(statistic) = payload.downcast::<P>() {
                            found.push(Discovered {
                                descriptor,
                                owner,
                                statistic,
                            });
                        }
                    }
                }
                if !query.children_only {
                    queue.push_back(child);
                }
            }
        }
        found
    }

    fn record_of(&self, key: NodeKey) -> Option<(StatisticDescriptor, Arc<dyn Any + Send + Sync>)> {
        self.shard(key).read().get(&key).and_then(|entry| {
            entry
                .statistic
                .as_ref()
                .map(|record| (record.descriptor.clone(), Arc::clone(&record.payload)))
        })
    }
}

impl Default for StatisticTreeRegistry {
    fn default() -> Self {
        Self::new(16, 0)
    }
}

impl fmt::Debug for StatisticTreeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticTreeRegistry")
            .field("shards", &self.shards.len())
            .field("nodes", &self.node_count())
            .finish()
    }
}
