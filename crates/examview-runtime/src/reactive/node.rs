#![forbid(unsafe_code)]

//! Dependency bookkeeping shared by [`Observable`](super::Observable) and
//! [`Computed`](super::Computed).
//!
//! Every cell owns a [`Dependents`] list of weak back-links to the computed
//! cells that read it. A write walks those links once (diamonds are visited
//! a single time), marks everything downstream dirty, and then settles the
//! affected cells in rank order so sources always settle before the cells
//! derived from them.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::observable::Subscription;

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a reactive cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Graph-facing behaviour of a cell. Implemented by the shared interiors of
/// observables and computed cells.
pub trait GraphNode {
    fn id(&self) -> CellId;

    /// Topological depth: 0 for observables, 1 + max(source rank) otherwise.
    fn rank(&self) -> u32;

    /// Recompute the cached rank after the source list changed.
    fn rerank(&self) {}

    fn dependents(&self) -> &Dependents;

    /// Direct sources of this cell.
    fn upstream(&self) -> Vec<Rc<dyn GraphNode>>;

    /// Flag the cached value as stale.
    fn mark_dirty(&self) {}

    /// Bring the cell up to date after a propagation pass if its policy asks
    /// for it, notifying subscribers on change.
    fn settle(&self) {}
}

/// Anything that can appear in a computed cell's dependency list.
pub trait Node {
    /// Identity of the underlying cell.
    fn cell_id(&self) -> CellId;

    #[doc(hidden)]
    fn graph_node(&self) -> Rc<dyn GraphNode>;
}

struct DependentEntry {
    token: Weak<()>,
    node: Weak<dyn GraphNode>,
}

/// Weak back-links from a cell to the computed cells that depend on it.
///
/// A link stays registered while the [`Subscription`] returned by
/// [`link`](Self::link) is alive.
#[derive(Default)]
pub struct Dependents {
    entries: RefCell<Vec<DependentEntry>>,
}

impl Dependents {
    pub(crate) fn link(&self, node: Weak<dyn GraphNode>) -> Subscription {
        let token = Rc::new(());
        self.entries.borrow_mut().push(DependentEntry {
            token: Rc::downgrade(&token),
            node,
        });
        Subscription::from_guard(token as Rc<dyn Any>)
    }

    /// Live dependents, pruning dead links as a side effect.
    pub(crate) fn live(&self) -> Vec<Rc<dyn GraphNode>> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.token.strong_count() > 0 && e.node.strong_count() > 0);
        entries.iter().filter_map(|e| e.node.upgrade()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.token.strong_count() > 0 && e.node.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for Dependents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependents").field("len", &self.len()).finish()
    }
}

/// Mark every direct and transitive dependent of `origin` dirty and return
/// them. Each cell appears once even when reachable along several paths.
pub(crate) fn propagate(origin: &dyn GraphNode) -> Vec<Rc<dyn GraphNode>> {
    let mut seen = HashSet::new();
    let mut affected = Vec::new();
    let mut stack = origin.dependents().live();
    while let Some(node) = stack.pop() {
        if !seen.insert(node.id()) {
            continue;
        }
        node.mark_dirty();
        stack.extend(node.dependents().live());
        affected.push(node);
    }
    trace!(origin = %origin.id(), affected = affected.len(), "propagated change");
    affected
}

/// Settle `affected` sources-first.
pub(crate) fn settle(affected: Vec<Rc<dyn GraphNode>>) {
    let mut ordered: Vec<(u32, CellId, Rc<dyn GraphNode>)> = affected
        .into_iter()
        .map(|node| (node.rank(), node.id(), node))
        .collect();
    ordered.sort_by_key(|(rank, id, _)| (*rank, *id));
    for (_, _, node) in ordered {
        node.settle();
    }
}

/// Whether `target` is `from` or one of its transitive sources.
pub(crate) fn reaches(from: &Rc<dyn GraphNode>, target: CellId) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![Rc::clone(from)];
    while let Some(node) = stack.pop() {
        if node.id() == target {
            return true;
        }
        if seen.insert(node.id()) {
            stack.extend(node.upstream());
        }
    }
    false
}
