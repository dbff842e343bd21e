#![forbid(unsafe_code)]

//! Observable cells: shared, version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] keeps its value, version, subscriber list and dependent
//! links in one reference-counted interior. Subscribers are held weakly; the
//! strong half lives in the [`Subscription`] guard handed back to the caller,
//! so dropping the guard is all it takes to unsubscribe.
//!
//! # Invariants
//!
//! 1. `get()` returns the value passed to the most recent effective `set()`.
//! 2. A `set()` with a value equal to the current one is a no-op: no version
//!    bump, no notifications, no dependent invalidation.
//! 3. A changing `set()` completes propagation (dependents marked dirty,
//!    subscribers notified, eager dependents recomputed) before returning.
//! 4. Notification iterates a snapshot, so a callback may drop its own or a
//!    sibling's subscription without panicking or skipping live siblings.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::node::{self, CellId, Dependents, GraphNode, Node};

/// RAII guard for a subscriber callback or a dependency link.
///
/// Dropping the guard unsubscribes before the next notification cycle.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Rc<dyn Any>,
}

impl Subscription {
    pub(crate) fn from_guard(guard: Rc<dyn Any>) -> Self {
        Self { _guard: guard }
    }

    /// Explicitly unsubscribe. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

struct Callback<T>(Box<dyn Fn(&T)>);

/// Registration-ordered list of weakly held callbacks.
pub(crate) struct Subscribers<T> {
    list: RefCell<Vec<Weak<Callback<T>>>>,
}

impl<T: 'static> Subscribers<T> {
    pub(crate) fn new() -> Self {
        Self {
            list: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback = Rc::new(Callback(Box::new(callback)));
        self.list.borrow_mut().push(Rc::downgrade(&callback));
        Subscription::from_guard(callback as Rc<dyn Any>)
    }

    pub(crate) fn notify(&self, value: &T) {
        let snapshot: Vec<Weak<Callback<T>>> = self.list.borrow().clone();
        for weak in snapshot {
            if let Some(callback) = weak.upgrade() {
                (callback.0)(value);
            }
        }
        self.list.borrow_mut().retain(|w| w.strong_count() > 0);
    }

    pub(crate) fn count(&self) -> usize {
        self.list
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub(crate) fn clear(&self) {
        self.list.borrow_mut().clear();
    }
}

/// Read access shared by every kind of cell. Used as the source bound for
/// [`Computed`](super::Computed) constructors.
pub trait Signal<T>: Node + Clone + 'static {
    /// Borrow the current (fresh) value.
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// Clone out the current (fresh) value.
    fn read(&self) -> T
    where
        T: Clone,
    {
        self.read_with(T::clone)
    }
}

struct ObservableInner<T> {
    id: CellId,
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: Subscribers<T>,
    dependents: Dependents,
}

impl<T: 'static> GraphNode for ObservableInner<T> {
    fn id(&self) -> CellId {
        self.id
    }

    fn rank(&self) -> u32 {
        0
    }

    fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    fn upstream(&self) -> Vec<Rc<dyn GraphNode>> {
        Vec::new()
    }
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                id: CellId::next(),
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: Subscribers::new(),
                dependents: Dependents::default(),
            }),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value. Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.commit();
        true
    }

    /// Mutate the value in place. Notifies only if the result differs from
    /// the previous value. Returns `true` if the value changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Register a callback invoked with the new value after every change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    /// Number of live subscriber callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.count()
    }

    /// Number of computed cells currently linked to this observable.
    #[must_use]
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    /// Number of effective changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Read-only handle to this observable.
    #[must_use]
    pub fn read_only(&self) -> ReadOnly<T> {
        ReadOnly {
            source: self.clone(),
        }
    }

    fn commit(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        let affected = node::propagate(&*self.inner);
        let snapshot = self.get();
        self.inner.subscribers.notify(&snapshot);
        node::settle(affected);
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Node for Observable<T> {
    fn cell_id(&self) -> CellId {
        self.inner.id
    }

    fn graph_node(&self) -> Rc<dyn GraphNode> {
        Rc::clone(&self.inner) as Rc<dyn GraphNode>
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> for Observable<T> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with(f)
    }
}

/// A read-only view of an [`Observable`], handed to consumers that may read
/// and subscribe but must not write.
pub struct ReadOnly<T> {
    source: Observable<T>,
}

impl<T> Clone for ReadOnly<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnly").field(&self.source).finish()
    }
}

impl<T: Clone + PartialEq + 'static> ReadOnly<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.source.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.source.with(f)
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.subscribe(callback)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.source.version()
    }
}

impl<T: Clone + PartialEq + 'static> Node for ReadOnly<T> {
    fn cell_id(&self) -> CellId {
        self.source.cell_id()
    }

    fn graph_node(&self) -> Rc<dyn GraphNode> {
        self.source.graph_node()
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> for ReadOnly<T> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.source.with(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_last_write() {
        let cell = Observable::new(1);
        cell.set(2);
        cell.set(3);
        assert_eq!(cell.get(), 3);
        assert_eq!(cell.version(), 2);
    }

    #[test]
    fn equal_write_is_a_no_op() {
        let cell = Observable::new("a".to_string());
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let _sub = cell.subscribe(move |_| hits_clone.set(hits_clone.get() + 1));

        assert!(!cell.set("a".to_string()));
        assert_eq!(hits.get(), 0);
        assert_eq!(cell.version(), 0);

        assert!(cell.set("b".to_string()));
        assert_eq!(hits.get(), 1);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn subscribers_see_new_value_in_registration_order() {
        let cell = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let _a = cell.subscribe(move |v| log1.borrow_mut().push(("a", *v)));
        let log2 = Rc::clone(&log);
        let _b = cell.subscribe(move |v| log2.borrow_mut().push(("b", *v)));

        cell.set(7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let cell = Observable::new(0);
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let sub = cell.subscribe(move |_| hits_clone.set(hits_clone.get() + 1));
        assert_eq!(cell.subscriber_count(), 1);

        cell.set(1);
        sub.unsubscribe();
        cell.set(2);

        assert_eq!(hits.get(), 1);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_self_during_notification() {
        let cell = Observable::new(0);
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let sibling_hits = Rc::new(Cell::new(0u32));

        let slot_clone = Rc::clone(&slot);
        let first = cell.subscribe(move |_| {
            slot_clone.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(first);

        let hits = Rc::clone(&sibling_hits);
        let _second = cell.subscribe(move |_| hits.set(hits.get() + 1));

        cell.set(1);
        cell.set(2);

        assert_eq!(sibling_hits.get(), 2);
        assert_eq!(cell.subscriber_count(), 1);
    }

    #[test]
    fn unsubscribe_sibling_during_notification() {
        let cell = Observable::new(0);
        let victim_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_hits = Rc::new(Cell::new(0u32));
        let tail_hits = Rc::new(Cell::new(0u32));

        let slot = Rc::clone(&victim_slot);
        let _killer = cell.subscribe(move |_| {
            slot.borrow_mut().take();
        });
        let hits = Rc::clone(&victim_hits);
        *victim_slot.borrow_mut() = Some(cell.subscribe(move |_| hits.set(hits.get() + 1)));
        let hits = Rc::clone(&tail_hits);
        let _tail = cell.subscribe(move |_| hits.set(hits.get() + 1));

        cell.set(1);

        assert_eq!(victim_hits.get(), 0);
        assert_eq!(tail_hits.get(), 1);
    }

    #[test]
    fn write_from_inside_callback_completes() {
        let source = Observable::new(0);
        let mirror = Observable::new(0);
        let mirror_clone = mirror.clone();
        let _sub = source.subscribe(move |v| {
            mirror_clone.set(*v * 10);
        });

        source.set(4);
        assert_eq!(mirror.get(), 40);
    }

    #[test]
    fn update_notifies_only_on_change() {
        let cell = Observable::new(vec![1, 2]);
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let _sub = cell.subscribe(move |_| hits_clone.set(hits_clone.get() + 1));

        assert!(!cell.update(|v| v.sort()));
        assert!(cell.update(|v| v.push(3)));
        assert_eq!(cell.get(), vec![1, 2, 3]);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let a = Observable::new(1);
        let b = a.clone();
        b.set(5);
        assert_eq!(a.get(), 5);
        assert_eq!(a.cell_id(), b.cell_id());
    }

    #[test]
    fn read_only_tracks_source() {
        let cell = Observable::new(1);
        let view = cell.read_only();
        cell.set(9);
        assert_eq!(view.get(), 9);
        assert_eq!(view.read(), 9);
        assert_eq!(view.cell_id(), cell.cell_id());
    }

    #[test]
    fn debug_format() {
        let cell = Observable::new(42);
        let dbg = format!("{cell:?}");
        assert!(dbg.contains("Observable"));
        assert!(dbg.contains("42"));
    }
}
