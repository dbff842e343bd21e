#![forbid(unsafe_code)]

//! Scroll animators and their completion handles.
//!
//! The carousel never drives time itself. It hands an [`Animator`] a start
//! offset, an end offset and a duration together with a one-shot
//! [`Completion`], and waits for that completion to fire.
//!
//! Two animators ship with the crate:
//!
//! - [`TweenAnimator`] runs a [`ScrollTween`] advanced by the host's frame
//!   loop through [`TweenAnimator::tick`].
//! - [`ManualAnimator`] records requests and completes them only when told
//!   to. Tests use it to hold an animation "in flight" for as long as they
//!   need.
//!
//! Both are cheap shared handles: the carousel owns one clone and the host
//! keeps another to drive it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::animation::{Animation, Easing, ScrollTween};

/// Receiver of animation completions, identified by the generation that was
/// current when the animation started.
pub trait CompletionSink {
    fn complete(&self, generation: u64);
}

/// One-shot completion callback for a single animation.
///
/// `complete` consumes the handle, so an animation can complete at most once.
/// Dropping the handle without completing it leaves the receiver waiting.
#[must_use = "an animation that never completes stalls its carousel"]
pub struct Completion {
    sink: Weak<dyn CompletionSink>,
    generation: u64,
}

impl Completion {
    pub(crate) fn new(sink: Weak<dyn CompletionSink>, generation: u64) -> Self {
        Self { sink, generation }
    }

    /// A completion with no receiver. Completing it does nothing.
    pub fn detached() -> Self {
        Self {
            sink: Weak::<Detached>::new(),
            generation: 0,
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signal the end of the animation.
    pub fn complete(self) {
        if let Some(sink) = self.sink.upgrade() {
            sink.complete(self.generation);
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("generation", &self.generation)
            .field("attached", &(self.sink.strong_count() > 0))
            .finish()
    }
}

struct Detached;

impl CompletionSink for Detached {
    fn complete(&self, _generation: u64) {}
}

/// Something that can animate a scroll offset.
pub trait Animator {
    /// Animate from `from` to `to` over `duration`, then call
    /// `on_complete.complete()` exactly once.
    ///
    /// Completing synchronously, before returning, is allowed.
    fn animate(&mut self, from: f64, to: f64, duration: Duration, on_complete: Completion);
}

// ---------------------------------------------------------------------------
// TweenAnimator
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TweenState {
    easing: Easing,
    offset: f64,
    active: Option<(ScrollTween, Completion)>,
}

/// Frame-driven animator built on [`ScrollTween`].
///
/// The host calls [`tick`](Self::tick) once per frame and applies the
/// returned offset to its viewport.
#[derive(Debug, Clone)]
pub struct TweenAnimator {
    state: Rc<RefCell<TweenState>>,
}

impl Default for TweenAnimator {
    fn default() -> Self {
        Self::new(Easing::default())
    }
}

impl TweenAnimator {
    #[must_use]
    pub fn new(easing: Easing) -> Self {
        Self {
            state: Rc::new(RefCell::new(TweenState {
                easing,
                offset: 0.0,
                active: None,
            })),
        }
    }

    /// Advance the running tween by `dt` and return the offset to display.
    ///
    /// When the tween reaches its end its completion fires after the
    /// animator's own state has been released, so the receiver may start
    /// the next animation on this same animator.
    pub fn tick(&self, dt: Duration) -> f64 {
        let (offset, finished) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let (offset, complete) = match state.active.as_mut() {
                Some((tween, _)) => {
                    tween.tick(dt);
                    (tween.offset(), tween.is_complete())
                }
                None => return state.offset,
            };
            state.offset = offset;
            let finished = if complete {
                state.active.take().map(|(_, done)| done)
            } else {
                None
            };
            (offset, finished)
        };
        if let Some(done) = finished {
            done.complete();
        }
        offset
    }

    /// Offset as of the last tick.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.state.borrow().offset
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.state.borrow().active.is_some()
    }
}

impl Animator for TweenAnimator {
    fn animate(&mut self, from: f64, to: f64, duration: Duration, on_complete: Completion) {
        let tween = {
            let state = self.state.borrow();
            ScrollTween::new(from, to, duration).with_easing(state.easing)
        };
        if tween.is_complete() {
            self.state.borrow_mut().offset = to;
            on_complete.complete();
            return;
        }
        // A superseded tween jumps to its end so its receiver is not left
        // waiting.
        let superseded = {
            let mut state = self.state.borrow_mut();
            state.offset = from;
            state.active.replace((tween, on_complete))
        };
        if let Some((_, done)) = superseded {
            done.complete();
        }
    }
}

// ---------------------------------------------------------------------------
// ManualAnimator
// ---------------------------------------------------------------------------

/// One `animate` call as recorded by [`ManualAnimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRequest {
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct ManualState {
    immediate: bool,
    queue: VecDeque<Completion>,
    requests: Vec<AnimationRequest>,
}

/// Animator that completes only on demand.
#[derive(Debug, Clone, Default)]
pub struct ManualAnimator {
    state: Rc<RefCell<ManualState>>,
}

impl ManualAnimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An animator that completes every animation before `animate` returns.
    #[must_use]
    pub fn immediate() -> Self {
        let animator = Self::default();
        animator.state.borrow_mut().immediate = true;
        animator
    }

    /// Complete the oldest in-flight animation. Returns `false` if none.
    pub fn finish_next(&self) -> bool {
        let next = self.state.borrow_mut().queue.pop_front();
        match next {
            Some(done) => {
                done.complete();
                true
            }
            None => false,
        }
    }

    /// Complete animations until none remain in flight, including ones
    /// started by earlier completions. Returns how many were completed.
    pub fn finish_all(&self) -> usize {
        let mut finished = 0;
        while self.finish_next() {
            finished += 1;
        }
        finished
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<AnimationRequest> {
        self.state.borrow().requests.clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.borrow().requests.len()
    }
}

impl Animator for ManualAnimator {
    fn animate(&mut self, from: f64, to: f64, duration: Duration, on_complete: Completion) {
        let immediate = {
            let mut state = self.state.borrow_mut();
            state.requests.push(AnimationRequest { from, to, duration });
            if !state.immediate {
                state.queue.push_back(on_complete);
                return;
            }
            on_complete
        };
        immediate.complete();
    }
}
