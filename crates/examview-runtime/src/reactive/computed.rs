#![forbid(unsafe_code)]

//! Computed values that auto-update from observable or computed sources.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a derivation closure, its fixed source list and the
//! cached result in shared, reference-counted storage. Sources may be
//! [`Observable`](super::Observable)s or other `Computed`s, so cells form a
//! DAG. When a source changes, every cell downstream of it is marked dirty in
//! one pass; the propagation [`Propagation`] policy then decides whether a
//! cell recomputes immediately (eager) or on the next read (lazy). A cell
//! with live subscribers is always settled eagerly so presentation callbacks
//! fire as part of the write that caused them.
//!
//! Cycles can only be built through forward declaration
//! ([`Computed::declare`] followed by a `define_*` call); the definition
//! walks the new sources once and rejects the cycle with
//! [`ReactiveError::Cycle`].
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of all
//!    sources, under either propagation policy.
//! 2. The derivation runs at most once per change cycle (memoization).
//! 3. If no source has changed, `get()` returns the cached value in O(1).
//! 4. Version increments by exactly 1 per recomputation.
//! 5. Subscribers are notified once per write that changed the value, even
//!    when another read recomputed the cell before it settled.
//!
//! # Failure Modes
//!
//! - **Derivation panics**: the cached value remains from the last
//!   successful computation and the dirty flag stays set, so the next read
//!   retries.
//! - **Source dropped**: the cell keeps its sources alive through its
//!   derivation closure, so this cannot strand it.
//! - **Disposed**: the cell keeps its last cached value and never becomes
//!   dirty again from its former sources.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::error::ReactiveError;
use super::node::{self, CellId, Dependents, GraphNode, Node};
use super::observable::{Signal, Subscribers, Subscription};

/// When a dirty computed cell re-evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Recompute on the next read.
    #[default]
    Lazy,
    /// Recompute as part of the write that dirtied it.
    Eager,
}

type ComputeFn<T> = Box<dyn Fn() -> T>;

/// Shared interior for [`Computed<T>`].
struct ComputedInner<T> {
    id: CellId,
    /// The derivation; `None` until a forward declaration is defined.
    compute: RefCell<Option<ComputeFn<T>>>,
    /// Cached result (None only before first computation).
    cached: RefCell<Option<T>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
    /// Recomputations that produced a different value.
    changes: Cell<u64>,
    /// `changes` as of the last delivery to subscribers.
    delivered: Cell<u64>,
    /// Cached topological depth.
    rank: Cell<u32>,
    propagation: Cell<Propagation>,
    disposed: Cell<bool>,
    sources: RefCell<Vec<Rc<dyn GraphNode>>>,
    /// Guards keeping this cell registered in its sources' dependent lists.
    links: RefCell<Vec<Subscription>>,
    dependents: Dependents,
    subscribers: Subscribers<T>,
}

impl<T: Clone + PartialEq + 'static> ComputedInner<T> {
    fn new(compute: Option<ComputeFn<T>>) -> Self {
        Self {
            id: CellId::next(),
            compute: RefCell::new(compute),
            cached: RefCell::new(None),
            dirty: Cell::new(true),
            version: Cell::new(0),
            changes: Cell::new(0),
            delivered: Cell::new(0),
            rank: Cell::new(1),
            propagation: Cell::new(Propagation::Lazy),
            disposed: Cell::new(false),
            sources: RefCell::new(Vec::new()),
            links: RefCell::new(Vec::new()),
            dependents: Dependents::default(),
            subscribers: Subscribers::new(),
        }
    }

    fn attach(this: &Rc<Self>, sources: Vec<Rc<dyn GraphNode>>) {
        let node: Rc<dyn GraphNode> = Rc::clone(this) as Rc<dyn GraphNode>;
        let weak = Rc::downgrade(&node);
        let links: Vec<Subscription> = sources
            .iter()
            .map(|source| source.dependents().link(weak.clone()))
            .collect();
        *this.sources.borrow_mut() = sources;
        *this.links.borrow_mut() = links;
        this.rerank();
    }

    /// Recompute if stale. Returns whether the cached value changed.
    fn refresh(&self) -> Result<bool, ReactiveError> {
        if !self.dirty.get() && self.cached.borrow().is_some() {
            return Ok(false);
        }
        let value = {
            let compute = self.compute.borrow();
            let Some(compute) = compute.as_ref() else {
                return Err(ReactiveError::Undefined { cell: self.id });
            };
            compute()
        };
        let changed = self.cached.borrow().as_ref() != Some(&value);
        *self.cached.borrow_mut() = Some(value);
        self.dirty.set(false);
        self.version.set(self.version.get() + 1);
        if changed {
            self.changes.set(self.changes.get() + 1);
        }
        Ok(changed)
    }

    /// Notify subscribers of every change not yet delivered, whichever
    /// read performed the recomputation.
    fn deliver(&self) {
        let changes = self.changes.get();
        if changes == self.delivered.get() {
            return;
        }
        self.delivered.set(changes);
        if let Some(value) = self.snapshot() {
            self.subscribers.notify(&value);
        }
    }

    fn snapshot(&self) -> Option<T> {
        self.cached.borrow().clone()
    }
}

impl<T: Clone + PartialEq + 'static> GraphNode for ComputedInner<T> {
    fn id(&self) -> CellId {
        self.id
    }

    fn rank(&self) -> u32 {
        self.rank.get()
    }

    fn rerank(&self) {
        let rank = self
            .sources
            .borrow()
            .iter()
            .map(|source| source.rank() + 1)
            .max()
            .unwrap_or(1);
        if rank == self.rank.get() {
            return;
        }
        self.rank.set(rank);
        // A forward declaration used as a source before it was defined
        // pushes its dependents deeper.
        for dependent in self.dependents.live() {
            dependent.rerank();
        }
    }

    fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    fn upstream(&self) -> Vec<Rc<dyn GraphNode>> {
        self.sources.borrow().clone()
    }

    fn mark_dirty(&self) {
        if !self.disposed.get() {
            self.dirty.set(true);
        }
    }

    fn settle(&self) {
        let observed = self.subscribers.count() > 0;
        if self.propagation.get() == Propagation::Lazy && !observed {
            return;
        }
        if let Err(err) = self.refresh() {
            warn!(%err, "computed cell could not settle");
            return;
        }
        if observed {
            self.deliver();
        }
    }
}

/// A memoized value derived from a fixed list of sources.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
///
/// # Invariants
///
/// 1. `dirty` is true after any source changes and before the next
///    recomputation.
/// 2. `version` increments by 1 on each recomputation.
/// 3. The derivation is called only when `dirty` is true and the cell is
///    read or settled eagerly.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("cached", &self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .field("propagation", &self.inner.propagation.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    fn build(sources: Vec<Rc<dyn GraphNode>>, compute: ComputeFn<T>) -> Self {
        let inner = Rc::new(ComputedInner::new(Some(compute)));
        ComputedInner::attach(&inner, sources);
        Self { inner }
    }

    /// Create a computed value derived from a single source.
    ///
    /// The `map` function receives a reference to the source value and
    /// returns the derived value.
    pub fn from_source<S, A>(source: &A, map: impl Fn(&S) -> T + 'static) -> Self
    where
        A: Signal<S>,
    {
        let s = source.clone();
        Self::build(
            vec![source.graph_node()],
            Box::new(move || s.read_with(|v| map(v))),
        )
    }

    /// Create a computed value derived from two sources.
    pub fn from2<S1, S2, A1, A2>(s1: &A1, s2: &A2, map: impl Fn(&S1, &S2) -> T + 'static) -> Self
    where
        A1: Signal<S1>,
        A2: Signal<S2>,
    {
        let (c1, c2) = (s1.clone(), s2.clone());
        Self::build(
            vec![s1.graph_node(), s2.graph_node()],
            Box::new(move || c1.read_with(|v1| c2.read_with(|v2| map(v1, v2)))),
        )
    }

    /// Create a computed value derived from three sources.
    pub fn from3<S1, S2, S3, A1, A2, A3>(
        s1: &A1,
        s2: &A2,
        s3: &A3,
        map: impl Fn(&S1, &S2, &S3) -> T + 'static,
    ) -> Self
    where
        A1: Signal<S1>,
        A2: Signal<S2>,
        A3: Signal<S3>,
    {
        let (c1, c2, c3) = (s1.clone(), s2.clone(), s3.clone());
        Self::build(
            vec![s1.graph_node(), s2.graph_node(), s3.graph_node()],
            Box::new(move || {
                c1.read_with(|v1| c2.read_with(|v2| c3.read_with(|v3| map(v1, v2, v3))))
            }),
        )
    }

    /// Create a computed value from a closure and an explicit dependency
    /// list. The closure must read only cells named in `deps`.
    pub fn from_fn(deps: &[&dyn Node], compute: impl Fn() -> T + 'static) -> Self {
        Self::build(
            deps.iter().map(|dep| dep.graph_node()).collect(),
            Box::new(compute),
        )
    }

    /// Forward-declare a computed cell. It can be used as a source right
    /// away but must be given a derivation with one of the `define_*`
    /// methods before it is read.
    #[must_use]
    pub fn declare() -> Self {
        Self {
            inner: Rc::new(ComputedInner::new(None)),
        }
    }

    /// Define a forward-declared cell from a closure and an explicit
    /// dependency list.
    ///
    /// # Errors
    ///
    /// [`ReactiveError::AlreadyDefined`] if the cell already has a
    /// derivation; [`ReactiveError::Cycle`] if any dependency is this cell or
    /// (transitively) derived from it.
    pub fn define_fn(
        &self,
        deps: &[&dyn Node],
        compute: impl Fn() -> T + 'static,
    ) -> Result<(), ReactiveError> {
        let sources: Vec<Rc<dyn GraphNode>> = deps.iter().map(|dep| dep.graph_node()).collect();
        self.install(sources, Box::new(compute))
    }

    /// Define a forward-declared cell from a single source.
    ///
    /// # Errors
    ///
    /// See [`define_fn`](Self::define_fn).
    pub fn define_from<S, A>(&self, source: &A, map: impl Fn(&S) -> T + 'static) -> Result<(), ReactiveError>
    where
        A: Signal<S>,
    {
        let s = source.clone();
        self.install(
            vec![source.graph_node()],
            Box::new(move || s.read_with(|v| map(v))),
        )
    }

    /// Define a forward-declared cell from two sources.
    ///
    /// # Errors
    ///
    /// See [`define_fn`](Self::define_fn).
    pub fn define_from2<S1, S2, A1, A2>(
        &self,
        s1: &A1,
        s2: &A2,
        map: impl Fn(&S1, &S2) -> T + 'static,
    ) -> Result<(), ReactiveError>
    where
        A1: Signal<S1>,
        A2: Signal<S2>,
    {
        let (c1, c2) = (s1.clone(), s2.clone());
        self.install(
            vec![s1.graph_node(), s2.graph_node()],
            Box::new(move || c1.read_with(|v1| c2.read_with(|v2| map(v1, v2)))),
        )
    }

    fn install(&self, sources: Vec<Rc<dyn GraphNode>>, compute: ComputeFn<T>) -> Result<(), ReactiveError> {
        let id = self.inner.id;
        if self.inner.compute.borrow().is_some() {
            return Err(ReactiveError::AlreadyDefined { cell: id });
        }
        if sources.iter().any(|source| node::reaches(source, id)) {
            return Err(ReactiveError::Cycle { cell: id });
        }
        *self.inner.compute.borrow_mut() = Some(compute);
        ComputedInner::attach(&self.inner, sources);
        self.invalidate();
        Ok(())
    }

    /// Switch this cell to `propagation`. Switching to eager evaluates the
    /// cell right away if it is defined.
    #[must_use]
    pub fn with_propagation(self, propagation: Propagation) -> Self {
        self.inner.propagation.set(propagation);
        if propagation == Propagation::Eager {
            // A forward declaration evaluates once it is defined.
            let _ = self.inner.refresh();
        }
        self
    }

    /// Shorthand for `with_propagation(Propagation::Eager)`.
    #[must_use]
    pub fn eager(self) -> Self {
        self.with_propagation(Propagation::Eager)
    }

    /// Current propagation policy.
    #[must_use]
    pub fn propagation(&self) -> Propagation {
        self.inner.propagation.get()
    }

    /// Get the current value, recomputing if any source has changed.
    ///
    /// # Panics
    ///
    /// Panics if the cell is a forward declaration that was never defined.
    /// Use [`try_get`](Self::try_get) to handle that case.
    #[must_use]
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Get the current value, recomputing if any source has changed.
    ///
    /// # Errors
    ///
    /// [`ReactiveError::Undefined`] for an undefined forward declaration.
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        self.inner.refresh()?;
        self.inner
            .snapshot()
            .ok_or(ReactiveError::Undefined { cell: self.inner.id })
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics on an undefined forward declaration, or if the closure reads
    /// this same cell while it is dirty.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let Err(err) = self.inner.refresh() {
            panic!("{err}");
        }
        let cached = self.inner.cached.borrow();
        match cached.as_ref() {
            Some(value) => f(value),
            None => panic!("{}", ReactiveError::Undefined { cell: self.inner.id }),
        }
    }

    /// Register a callback invoked with the new value whenever a source
    /// change produces a different value. Subscribed cells settle eagerly.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        // Prime the cache so the first change has a baseline to compare to.
        if self.inner.refresh().is_ok() {
            self.inner.delivered.set(self.inner.changes.get());
        }
        self.inner.subscribers.subscribe(callback)
    }

    /// Number of live subscriber callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.count()
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force invalidation of this cell and everything derived from it, then
    /// settle eager and observed cells.
    pub fn invalidate(&self) {
        if self.inner.disposed.get() {
            return;
        }
        self.inner.dirty.set(true);
        let mut affected = node::propagate(&*self.inner);
        affected.push(Rc::clone(&self.inner) as Rc<dyn GraphNode>);
        node::settle(affected);
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Detach from every source and drop every subscriber. The cell keeps
    /// its last value and never becomes dirty again.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.links.borrow_mut().clear();
        self.inner.subscribers.clear();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<T: Clone + PartialEq + 'static> Node for Computed<T> {
    fn cell_id(&self) -> CellId {
        self.inner.id
    }

    fn graph_node(&self) -> Rc<dyn GraphNode> {
        Rc::clone(&self.inner) as Rc<dyn GraphNode>
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> for Computed<T> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with(f)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
