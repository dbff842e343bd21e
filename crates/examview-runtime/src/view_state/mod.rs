#![forbid(unsafe_code)]

//! View-state graphs for the exam, its questions and their parts.
//!
//! Each displayed entity gets one graph: a set of [`Observable`] cells fed
//! from a read-only domain source, and [`Computed`] cells deriving the
//! strings and flags the renderer binds to.
//!
//! # Lifecycle
//!
//! ```text
//! new(source) ──► refresh()* ──► bind(new source) ──► refresh()* ──► dispose()
//! ```
//!
//! - `refresh()` pulls the current domain state into the observables.
//!   Equal values are not rewritten, so an idle refresh notifies nobody.
//! - `bind()` points the graph at a regenerated source. Computed cells and
//!   subscriptions survive; only the observables are rewritten.
//! - `dispose()` detaches every computed cell. Later `refresh()` or
//!   `bind()` calls fail with [`ViewError::Disposed`].
//!
//! [`Observable`]: crate::reactive::Observable
//! [`Computed`]: crate::reactive::Computed

pub(crate) mod exam;
mod feedback;
mod format;
pub(crate) mod part;
pub(crate) mod question;
mod source;

pub use exam::{ExamView, InfoPage, ViewType};
pub use feedback::{AnswerState, FeedbackPolicy, ScoreFeedback, marking_feedback_messages};
pub use format::{
    format_time, marks_string, nice_number, percent_display, pluralise, score_display,
    secs_to_display_time,
};
pub use part::{AnswerInput, ExprRenderer, JmePreview, PartDisplay, PartView, PreviewFlush};
pub use question::QuestionView;
pub use source::{
    ChoiceLayout, ExamMode, ExamSettings, ExamSource, MarkingAction, MarkingOp, PartKind,
    PartSource, QuestionSource,
};

use std::rc::Rc;

use thiserror::Error;

use crate::reactive::ReactiveError;

/// Errors raised by view-state graphs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("{entity} view used after dispose")]
    Disposed { entity: String },

    #[error("{entity} has no {what}")]
    Missing { entity: String, what: String },

    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}

pub type Result<T> = std::result::Result<T, ViewError>;

/// A view-state graph mirroring one domain entity.
pub trait ViewState {
    /// The domain accessor this graph reads from.
    type Source: ?Sized;

    /// Pull the current domain state into the graph.
    ///
    /// # Errors
    ///
    /// [`ViewError::Disposed`] after [`dispose`](Self::dispose).
    fn refresh(&self) -> Result<()>;

    /// Point the graph at a new source and refresh.
    ///
    /// # Errors
    ///
    /// [`ViewError::Disposed`] after [`dispose`](Self::dispose).
    fn bind(&mut self, source: Rc<Self::Source>) -> Result<()>;

    /// Detach every computed cell and internal subscription.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

pub(crate) fn ensure_live(disposed: bool, entity: impl FnOnce() -> String) -> Result<()> {
    if disposed {
        let entity = entity();
        tracing::warn!(%entity, "view used after dispose");
        return Err(ViewError::Disposed { entity });
    }
    Ok(())
}
