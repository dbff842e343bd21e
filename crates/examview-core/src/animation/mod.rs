#![forbid(unsafe_code)]

//! Time-driven animation primitives.
//!
//! An [`Animation`] advances by explicit `tick(dt)` calls; nothing here reads
//! a clock, so tests drive time deterministically. [`ScrollTween`] is the one
//! concrete animation the carousel needs: an eased interpolation between two
//! scroll offsets.
//!
//! # Invariants
//!
//! 1. `value()` is in `0.0..=1.0` and reaches `1.0` exactly when
//!    `is_complete()` becomes true.
//! 2. Ticking a complete animation changes nothing.
//! 3. A zero-duration animation is complete on construction.

use web_time::Duration;

/// A value that progresses from 0.0 to 1.0 over time.
pub trait Animation {
    /// Advance by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end.
    fn is_complete(&self) -> bool;

    /// Eased progress in `0.0..=1.0`.
    fn value(&self) -> f32;

    /// Return to the initial state.
    fn reset(&mut self);
}

/// Easing curve applied to linear progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Easing {
    Linear,
    EaseIn,
    /// Quadratic ease-out. Matches the "swing" feel of list scrolling.
    #[default]
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` (clamped to `0.0..=1.0`) through the curve.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - 2.0 * (1.0 - t) * (1.0 - t)
                }
            }
        }
    }
}

/// Eased interpolation between two scroll offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollTween {
    from: f64,
    to: f64,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl ScrollTween {
    /// Tween from `from` to `to` over `duration`.
    #[must_use]
    pub fn new(from: f64, to: f64, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            easing: Easing::default(),
        }
    }

    /// Use `easing` instead of the default ease-out.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Offset at the current point in time.
    #[must_use]
    pub fn offset(&self) -> f64 {
        if self.is_complete() {
            return self.to;
        }
        self.from + (self.to - self.from) * f64::from(self.value())
    }

    #[must_use]
    pub fn start_offset(&self) -> f64 {
        self.from
    }

    #[must_use]
    pub fn end_offset(&self) -> f64 {
        self.to
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn linear_progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }
}

impl Animation for ScrollTween {
    fn tick(&mut self, dt: Duration) {
        if self.is_complete() {
            return;
        }
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        self.easing.apply(self.linear_progress())
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}
