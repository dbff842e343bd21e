#![forbid(unsafe_code)]

//! Reactive data bindings for examview.
//!
//! This module provides change-tracking primitives for view state:
//!
//! - [`Observable`]: A shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks.
//! - [`ReadOnly`]: A handle to an `Observable` that can be read and
//!   subscribed to but not written.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//! - [`Computed`]: A memoized value derived from a fixed list of observable
//!   or computed sources, evaluated lazily or eagerly per [`Propagation`].
//!
//! # Architecture
//!
//! Cells use `Rc` + `Cell`/`RefCell` for single-threaded shared ownership.
//! Subscribers and dependency back-links are stored weakly and cleaned up
//! lazily during notification.
//!
//! A write marks every downstream computed cell dirty in one pass, notifies
//! the written cell's subscribers, then settles eager and observed cells in
//! rank order (sources before dependents).
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. A computed cell never returns a stale value.
//! 6. A dependency cycle is rejected when it is declared.

pub mod computed;
pub mod error;
mod node;
pub mod observable;

pub use computed::{Computed, Propagation};
pub use error::ReactiveError;
pub use node::{CellId, Node};
pub use observable::{Observable, ReadOnly, Signal, Subscription};
