#![forbid(unsafe_code)]

use web_time::Duration;

use crate::animation::Easing;

/// Configuration for a [`Carousel`](super::Carousel).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CarouselConfig {
    /// Items moved per `scroll_up` / `scroll_down` call.
    /// Default: 1.
    pub step: usize,

    /// Duration of one scroll animation.
    /// Default: 200ms.
    pub animation_duration: Duration,

    /// Easing handed to tween-based animators.
    /// Default: ease-out.
    pub easing: Easing,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            step: 1,
            animation_duration: Duration::from_millis(200),
            easing: Easing::EaseOut,
        }
    }
}

impl CarouselConfig {
    /// Set the step size. A step of 0 is raised to 1.
    #[must_use]
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    #[must_use]
    pub fn with_animation_duration(mut self, duration: Duration) -> Self {
        self.animation_duration = duration;
        self
    }

    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Preset used by the question list: two items per step.
    #[must_use]
    pub fn question_list() -> Self {
        Self::default().with_step(2)
    }
}
