#![forbid(unsafe_code)]

//! Command dispatch between the presentation layer and the exam.
//!
//! The presentation layer turns raw input into [`ExamCommand`]s and hands
//! them to [`ExamDisplay::dispatch`]. Dispatch updates view-only state (the
//! question menu carousel, previews, warnings) directly and returns the
//! [`DomainRequest`] the host must apply to the exam, if any. Once the host
//! has applied it, it calls back into the display (`show_question`,
//! `refresh`, ...) so the view catches up.
//!
//! # Invariants
//!
//! - Dispatch never mutates the exam; every domain change leaves as a
//!   [`DomainRequest`].
//! - Commands the current policy forbids (reverse navigation, reveal,
//!   pause, regeneration) produce no request.
//! - Whenever a question becomes current, the question menu scrolls to it.

use examview_core::carousel::{Animator, Carousel, Measure};
use tracing::debug;

use crate::view_state::{
    ExamView, ExprRenderer, InfoPage, PartView, PreviewFlush, QuestionView, Result, ViewError,
    ViewState,
};

/// A discrete user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamCommand {
    /// Jump to a question from the question menu.
    SelectQuestion(usize),
    NextQuestion,
    PreviousQuestion,
    /// Scroll the question menu by one step without changing question.
    ScrollMenuUp,
    ScrollMenuDown,
    /// Text typed into a part's input.
    PartInput { path: String, text: String },
    /// A multiple-response cell was ticked or unticked.
    ChooseAnswer {
        path: String,
        answer: usize,
        choice: usize,
        ticked: bool,
    },
    SubmitPart(String),
    ShowSteps(String),
    SubmitQuestion,
    RevealAnswer,
    ShowAdvice,
    RegenQuestion,
    Pause,
    End,
}

/// An answer to store against a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAnswer {
    Text(String),
    Choice {
        answer: usize,
        choice: usize,
        ticked: bool,
    },
}

/// A change the host must make to the exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainRequest {
    JumpQuestion(usize),
    StoreAnswer { path: String, answer: StoredAnswer },
    SubmitPart(String),
    ShowSteps(String),
    SubmitQuestion,
    RevealAnswer,
    ShowAdvice,
    RegenQuestion,
    Pause,
    End,
}

/// The exam view and its question menu, wired together.
#[derive(Debug)]
pub struct ExamDisplay<M, A> {
    exam: ExamView,
    menu: Carousel<M, A>,
}

impl<M, A> ExamDisplay<M, A>
where
    M: Measure + 'static,
    A: Animator + 'static,
{
    pub fn new(exam: ExamView, menu: Carousel<M, A>) -> Self {
        Self { exam, menu }
    }

    #[must_use]
    pub fn exam(&self) -> &ExamView {
        &self.exam
    }

    #[must_use]
    pub fn menu(&self) -> &Carousel<M, A> {
        &self.menu
    }

    /// Apply `command` to the view and return what the exam must do.
    ///
    /// # Errors
    ///
    /// [`ViewError::Missing`] when the command names a question or part
    /// that does not exist, or needs a current question and there is none.
    pub fn dispatch(&mut self, command: ExamCommand) -> Result<Option<DomainRequest>> {
        debug!(?command, "dispatch");
        let request = match command {
            ExamCommand::SelectQuestion(number) => {
                let question = self.exam.question(number).ok_or_else(|| ViewError::Missing {
                    entity: "exam".into(),
                    what: format!("question {}", number + 1),
                })?;
                if !question.menu_visible().get() {
                    debug!(number, "question hidden from menu");
                    return Ok(None);
                }
                self.scroll_menu_to(number);
                Some(DomainRequest::JumpQuestion(number))
            }
            ExamCommand::NextQuestion => {
                let current = self.current_number()?;
                self.exam
                    .can_advance()
                    .get()
                    .then(|| DomainRequest::JumpQuestion(current + 1))
            }
            ExamCommand::PreviousQuestion => {
                let current = self.current_number()?;
                self.exam
                    .can_reverse()
                    .get()
                    .then(|| DomainRequest::JumpQuestion(current.saturating_sub(1)))
            }
            ExamCommand::ScrollMenuUp => {
                self.menu.scroll_up();
                None
            }
            ExamCommand::ScrollMenuDown => {
                self.menu.scroll_down();
                None
            }
            ExamCommand::PartInput { path, text } => {
                let part = self.part(&path)?;
                if part.input_disabled().get() {
                    None
                } else {
                    part.input(text.clone());
                    Some(DomainRequest::StoreAnswer {
                        path,
                        answer: StoredAnswer::Text(text),
                    })
                }
            }
            ExamCommand::ChooseAnswer {
                path,
                answer,
                choice,
                ticked,
            } => {
                let part = self.part(&path)?;
                (!part.input_disabled().get()).then(|| DomainRequest::StoreAnswer {
                    path,
                    answer: StoredAnswer::Choice {
                        answer,
                        choice,
                        ticked,
                    },
                })
            }
            ExamCommand::SubmitPart(path) => {
                self.part(&path)?.remove_warnings();
                Some(DomainRequest::SubmitPart(path))
            }
            ExamCommand::ShowSteps(path) => {
                let part = self.part(&path)?;
                (!part.steps_shown().get()).then(|| DomainRequest::ShowSteps(path))
            }
            ExamCommand::SubmitQuestion => {
                let question = self.current_question()?;
                for part in question.parts() {
                    part.remove_warnings();
                }
                Some(DomainRequest::SubmitQuestion)
            }
            ExamCommand::RevealAnswer => self
                .current_question()?
                .can_reveal()
                .get()
                .then_some(DomainRequest::RevealAnswer),
            ExamCommand::ShowAdvice => {
                (!self.current_question()?.advice_displayed().get())
                    .then_some(DomainRequest::ShowAdvice)
            }
            ExamCommand::RegenQuestion => {
                self.current_question()?;
                self.exam
                    .settings()
                    .with(|s| s.allow_regen)
                    .then_some(DomainRequest::RegenQuestion)
            }
            ExamCommand::Pause => self.exam.allow_pause().get().then_some(DomainRequest::Pause),
            ExamCommand::End => Some(DomainRequest::End),
        };
        if request.is_none() {
            debug!("command produced no request");
        }
        Ok(request)
    }

    /// Show the exam's current question and scroll the menu to it.
    ///
    /// # Errors
    ///
    /// As [`ExamView::show_question`].
    pub fn show_question(&mut self) -> Result<()> {
        self.exam.show_question()?;
        if let Some(number) = self.exam.current_question().get() {
            self.scroll_menu_to(number);
        }
        Ok(())
    }

    pub fn show_info_page(&mut self, page: InfoPage) {
        self.exam.show_info_page(page);
    }

    /// # Errors
    ///
    /// As [`ExamView::start_regen`].
    pub fn start_regen(&mut self) -> Result<()> {
        self.exam.start_regen()
    }

    /// # Errors
    ///
    /// As [`ExamView::end_regen`].
    pub fn end_regen(&mut self) -> Result<()> {
        self.exam.end_regen()
    }

    /// # Errors
    ///
    /// [`ViewError::Disposed`] after the exam view was disposed.
    pub fn refresh(&self) -> Result<()> {
        self.exam.refresh()
    }

    /// # Errors
    ///
    /// As [`ExamView::end`].
    pub fn end(&mut self) -> Result<()> {
        self.exam.end()
    }

    /// Whether any part of the current question has preview text waiting.
    #[must_use]
    pub fn preview_pending(&self) -> bool {
        self.current_parts()
            .iter()
            .any(|part| part.preview().is_some_and(|p| p.is_pending()))
    }

    /// Render every waiting preview in the current question. Returns the
    /// path and outcome of each part that had something to flush.
    pub fn flush_previews(&self, renderer: &dyn ExprRenderer) -> Vec<(String, PreviewFlush)> {
        self.current_parts()
            .into_iter()
            .filter_map(|part| match part.flush_preview(renderer) {
                PreviewFlush::Idle => None,
                outcome => Some((part.path().to_owned(), outcome)),
            })
            .collect()
    }

    fn scroll_menu_to(&self, number: usize) {
        let outcome = self
            .menu
            .scroll_to(isize::try_from(number).unwrap_or(isize::MAX));
        debug!(number, ?outcome, "question menu scroll");
    }

    fn current_number(&self) -> Result<usize> {
        self.exam
            .current_question()
            .get()
            .ok_or_else(|| ViewError::Missing {
                entity: "exam".into(),
                what: "current question".into(),
            })
    }

    fn current_question(&self) -> Result<&QuestionView> {
        let number = self.current_number()?;
        self.exam.question(number).ok_or_else(|| ViewError::Missing {
            entity: "exam".into(),
            what: format!("question {}", number + 1),
        })
    }

    fn part(&self, path: &str) -> Result<&PartView> {
        let question = self.current_question()?;
        question.part(path).ok_or_else(|| ViewError::Missing {
            entity: format!("question {}", question.number().get() + 1),
            what: format!("part {path}"),
        })
    }

    /// Every part, gap and step of the current question, depth first.
    fn current_parts(&self) -> Vec<&PartView> {
        fn walk<'a>(part: &'a PartView, out: &mut Vec<&'a PartView>) {
            out.push(part);
            for child in part.gaps().iter().chain(part.steps()) {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        if let Some(question) = self.exam.current() {
            for part in question.parts() {
                walk(part, &mut out);
            }
        }
        out
    }
}
