#![forbid(unsafe_code)]

//! examview public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use examview_core as core;
#[cfg(feature = "runtime")]
pub use examview_runtime as runtime;

pub mod prelude {
    pub use examview_core::carousel::{
        Animator, Carousel, CarouselConfig, Completion, ListMetrics, ManualAnimator, Measure,
        ScrollOutcome, TweenAnimator,
    };

    #[cfg(feature = "runtime")]
    pub use examview_runtime::{
        Computed, DomainRequest, ExamCommand, ExamDisplay, ExamView, Observable, PartView,
        QuestionView, ReadOnly, Subscription, ViewError, ViewState,
        view_state::{ExamSettings, ExamSource, PartSource, QuestionSource},
    };
}
