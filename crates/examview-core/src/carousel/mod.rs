#![forbid(unsafe_code)]

//! Coalescing scroll controller for a list inside a fixed viewport.
//!
//! A [`Carousel`] brings one list item to the top of the viewport by
//! animating the scroll offset. It runs at most one animation at a time.
//! Requests that arrive while an animation is in flight are coalesced:
//! only the most recent one is remembered, and it starts as soon as the
//! running animation completes.
//!
//! ```text
//!            scroll_to(t)                        scroll_to(t)
//!   ┌──────┐ ───────────► ┌───────────┐ ◄───── pending := t
//!   │ Idle │              │ Animating │
//!   └──────┘ ◄─────────── └───────────┘
//!        completion: current := target; scroll_to(pending.take())
//! ```
//!
//! # Invariants
//!
//! 1. At most one animation is in flight.
//! 2. `pending` is `Some` only while an animation is in flight.
//! 3. A completion is processed at most once, and never re-entrantly inside
//!    the `scroll_to` that started its animation.
//! 4. Targets are clamped to `0..=max_reachable`, recomputed from a fresh
//!    measurement on every `scroll_to`.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | No items, zero viewport, non-finite metrics | No-op, logged at debug |
//! | Target out of range | Clamped |
//! | Target already current | No-op |
//! | Stale or repeated completion | Ignored |

mod animator;
mod config;
mod measure;

pub use animator::{
    AnimationRequest, Animator, Completion, CompletionSink, ManualAnimator, TweenAnimator,
};
pub use config::CarouselConfig;
pub use measure::{ListMetrics, Measure, MeasureError};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

/// What a `scroll_to` (or step) call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// An animation started from item `from` towards item `to`.
    Started { from: usize, to: usize },
    /// An animation was already running; the target was stored as pending.
    Queued,
    /// The clamped target is already the current item.
    Unchanged,
    /// The viewport already sits on the target item; it became current
    /// without animating.
    Adopted(usize),
    /// The list could not be measured.
    NotReady,
}

#[derive(Debug, Default)]
struct State {
    current: usize,
    going: bool,
    pending: Option<isize>,
    in_flight: Option<usize>,
    generation: u64,
    /// Set while `Animator::animate` is running.
    starting: bool,
    /// A completion that arrived while `starting`.
    early: Option<u64>,
}

struct Shared<M, A> {
    this: Weak<Self>,
    config: CarouselConfig,
    measure: M,
    animator: RefCell<A>,
    state: RefCell<State>,
}

/// Scroll controller for one list container.
///
/// Cloning yields another handle to the same controller.
pub struct Carousel<M, A> {
    shared: Rc<Shared<M, A>>,
}

impl<M, A> Clone for Carousel<M, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<M, A> fmt::Debug for Carousel<M, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Carousel")
            .field("current", &state.current)
            .field("going", &state.going)
            .field("pending", &state.pending)
            .field("in_flight", &state.in_flight)
            .field("config", &self.shared.config)
            .finish()
    }
}

impl<M, A> Carousel<M, A>
where
    M: Measure + 'static,
    A: Animator + 'static,
{
    /// Create a controller over `measure`, animating through `animator`.
    /// Starts idle on item 0.
    pub fn new(config: CarouselConfig, measure: M, animator: A) -> Self {
        let shared = Rc::new_cyclic(|this| Shared {
            this: this.clone(),
            config,
            measure,
            animator: RefCell::new(animator),
            state: RefCell::new(State::default()),
        });
        Self { shared }
    }

    /// Bring item `target` to the top of the viewport.
    ///
    /// Never fails: unusable measurements and out-of-range targets are
    /// handled locally (see the module docs).
    pub fn scroll_to(&self, target: isize) -> ScrollOutcome {
        self.shared.scroll_to(target)
    }

    /// Move `config.step` items towards the start of the list.
    pub fn scroll_up(&self) -> ScrollOutcome {
        self.shared.step(Direction::Up)
    }

    /// Move `config.step` items towards the end of the list.
    pub fn scroll_down(&self) -> ScrollOutcome {
        self.shared.step(Direction::Down)
    }

    /// Largest index `scroll_to` can currently reach, or `None` if the list
    /// cannot be measured.
    #[must_use]
    pub fn max_reachable(&self) -> Option<usize> {
        let metrics = self.shared.measure.measure();
        metrics.validate().ok()?;
        Some(metrics.max_reachable_index())
    }
}

impl<M, A> Carousel<M, A> {
    /// Index of the item the viewport last settled on.
    #[must_use]
    pub fn current(&self) -> usize {
        self.shared.state.borrow().current
    }

    /// Whether an animation is in flight.
    #[must_use]
    pub fn is_going(&self) -> bool {
        self.shared.state.borrow().going
    }

    /// The coalesced request waiting for the running animation, if any.
    #[must_use]
    pub fn pending(&self) -> Option<isize> {
        self.shared.state.borrow().pending
    }

    /// Target of the running animation.
    #[must_use]
    pub fn in_flight(&self) -> Option<usize> {
        self.shared.state.borrow().in_flight
    }

    #[must_use]
    pub fn config(&self) -> &CarouselConfig {
        &self.shared.config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl<M, A> Shared<M, A>
where
    M: Measure + 'static,
    A: Animator + 'static,
{
    fn scroll_to(&self, target: isize) -> ScrollOutcome {
        {
            let mut state = self.state.borrow_mut();
            if state.going {
                debug!(requested = target, superseded = ?state.pending, "carousel busy; request coalesced");
                state.pending = Some(target);
                return ScrollOutcome::Queued;
            }
        }

        let metrics = self.measure.measure();
        if let Err(err) = metrics.validate() {
            debug!(requested = target, %err, "carousel cannot measure list; scroll ignored");
            return ScrollOutcome::NotReady;
        }
        let index = metrics.clamp_index(target);
        if usize::try_from(target).ok() != Some(index) {
            debug!(
                requested = target,
                clamped = index,
                max_reachable = metrics.max_reachable_index(),
                "carousel target clamped"
            );
        }
        let to = metrics.item_offsets[index];
        let from = metrics.scroll_offset;

        let (from_index, generation) = {
            let mut state = self.state.borrow_mut();
            if index == state.current {
                return ScrollOutcome::Unchanged;
            }
            if to == from {
                debug!(index, "carousel viewport already on target");
                state.current = index;
                return ScrollOutcome::Adopted(index);
            }
            state.going = true;
            state.pending = None;
            state.in_flight = Some(index);
            state.generation += 1;
            state.starting = true;
            state.early = None;
            (state.current, state.generation)
        };

        debug!(from = from_index, to = index, generation, "carousel animation started");
        let sink: Weak<dyn CompletionSink> = self.this.clone();
        self.animator.borrow_mut().animate(
            from,
            to,
            self.config.animation_duration,
            Completion::new(sink, generation),
        );

        let early = {
            let mut state = self.state.borrow_mut();
            state.starting = false;
            state.early.take()
        };
        if let Some(generation) = early {
            self.finish(generation);
        }

        ScrollOutcome::Started {
            from: from_index,
            to: index,
        }
    }

    fn step(&self, direction: Direction) -> ScrollOutcome {
        let len = self.measure.measure().len();
        if len == 0 {
            debug!(?direction, "carousel has no items; step ignored");
            return ScrollOutcome::NotReady;
        }
        let step = self.config.step.max(1) as isize;
        let target = {
            let state = self.state.borrow();
            let candidates = [
                Some(state.current as isize),
                state.in_flight.map(|i| i as isize),
                state.pending,
            ];
            let known = candidates.into_iter().flatten();
            match direction {
                Direction::Up => known.min().unwrap_or(0) - step,
                Direction::Down => known.max().unwrap_or(0) + step,
            }
        };
        self.scroll_to(target.clamp(0, len as isize - 1))
    }

    fn finish(&self, generation: u64) {
        let (current, pending) = {
            let mut state = self.state.borrow_mut();
            state.going = false;
            if let Some(index) = state.in_flight.take() {
                state.current = index;
            }
            (state.current, state.pending.take())
        };
        debug!(current, generation, ?pending, "carousel animation complete");
        if let Some(target) = pending {
            self.scroll_to(target);
        }
    }
}

impl<M, A> CompletionSink for Shared<M, A>
where
    M: Measure + 'static,
    A: Animator + 'static,
{
    fn complete(&self, generation: u64) {
        {
            let mut state = self.state.borrow_mut();
            if !state.going || generation != state.generation {
                debug!(generation, current = state.generation, "stale carousel completion ignored");
                return;
            }
            if state.starting {
                state.early = Some(generation);
                return;
            }
        }
        self.finish(generation);
    }
}
