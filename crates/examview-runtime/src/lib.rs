#![forbid(unsafe_code)]

//! Runtime: reactive cells, exam view-state graphs and command dispatch.
//!
//! Everything here is single-threaded. Domain state flows in through the
//! read-only [`view_state::ExamSource`] family of traits; user actions flow
//! out through [`command::ExamDisplay::dispatch`].

pub mod command;
pub mod reactive;
pub mod view_state;

pub use command::{DomainRequest, ExamCommand, ExamDisplay, StoredAnswer};
pub use reactive::{Computed, Observable, Propagation, ReactiveError, ReadOnly, Subscription};
pub use view_state::{ExamView, PartView, QuestionView, ViewError, ViewState};
