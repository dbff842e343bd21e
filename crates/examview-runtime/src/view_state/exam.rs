#![forbid(unsafe_code)]

//! Exam-level view state: which page is showing, navigation, the overall
//! score and timing.

use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Local};
use tracing::debug;

use super::format::{format_time, percent_display, score_display, secs_to_display_time};
use super::question::QuestionView;
use super::source::{ExamMode, ExamSettings, ExamSource, QuestionSource};
use super::{Result, ViewError, ViewState, ensure_live};
use crate::reactive::{Computed, Node, Observable, ReadOnly};

/// The non-question pages of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InfoPage {
    FrontPage,
    Result,
    Suspend,
    Exit,
}

/// What the main pane is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewType {
    InfoPage,
    Question,
    #[default]
    None,
}

/// View state for the whole exam.
pub struct ExamView {
    source: Rc<dyn ExamSource>,
    disposed: bool,

    settings: Observable<ExamSettings>,
    mode: Observable<ExamMode>,
    saving: Observable<bool>,
    info_page: Observable<Option<InfoPage>>,
    current_question: Observable<Option<usize>>,
    regenerating: Observable<bool>,
    confirm_leave: Observable<bool>,

    score: Observable<f64>,
    marks: Observable<f64>,
    percent_score: Observable<f64>,
    display_time: Observable<String>,
    time_spent: Observable<String>,
    start: Observable<Option<DateTime<Local>>>,
    stop: Observable<Option<DateTime<Local>>>,
    result: Observable<String>,
    passed: Observable<bool>,
    feedback_message: Observable<Option<String>>,

    view_type: Computed<ViewType>,
    current_question_number: Computed<Option<usize>>,
    can_reverse: Computed<bool>,
    can_advance: Computed<bool>,
    percent_pass: Computed<String>,
    exam_score_display: Computed<String>,
    show_question_group_names: Computed<bool>,
    allow_pause: Computed<bool>,
    start_time: Computed<String>,
    end_time: Computed<String>,
    questions_attempted: Computed<usize>,
    questions_attempted_display: Computed<String>,

    questions: Vec<QuestionView>,
}

impl fmt::Debug for ExamView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamView")
            .field("mode", &self.mode.get())
            .field("info_page", &self.info_page.get())
            .field("current_question", &self.current_question.get())
            .field("questions", &self.questions.len())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

fn formatted_time(cell: &Observable<Option<DateTime<Local>>>) -> Computed<String> {
    Computed::from_source(cell, |time: &Option<DateTime<Local>>| {
        time.as_ref().map(format_time).unwrap_or_default()
    })
}

impl ExamView {
    pub fn new(source: Rc<dyn ExamSource>) -> Self {
        let settings = Observable::new(source.settings());
        let mode = Observable::new(source.mode());
        let saving = Observable::new(false);
        let info_page = Observable::new(None);
        let current_question = Observable::new(None);

        let score = Observable::new(source.score());
        let marks = Observable::new(source.marks());
        let start = Observable::new(None);
        let stop = Observable::new(None);

        let questions: Vec<QuestionView> = source
            .questions()
            .into_iter()
            .map(|question| QuestionView::new(question, &settings.get()))
            .collect();

        let view_type = Computed::from2(
            &info_page,
            &current_question,
            |page: &Option<InfoPage>, current: &Option<usize>| match (page, current) {
                (Some(_), _) => ViewType::InfoPage,
                (None, Some(_)) => ViewType::Question,
                (None, None) => ViewType::None,
            },
        );

        let current_question_number =
            Computed::from_source(&current_question, |current: &Option<usize>| *current);

        let can_reverse = Computed::from2(
            &settings,
            &current_question_number,
            |settings: &ExamSettings, current: &Option<usize>| {
                settings.navigate_reverse && current.is_some_and(|n| n > 0)
            },
        );

        // Forward navigation is only bounded by the question count.
        let can_advance = Computed::from2(
            &settings,
            &current_question_number,
            |settings: &ExamSettings, current: &Option<usize>| {
                current.is_some_and(|n| n + 1 < settings.num_questions)
            },
        );

        let percent_pass = Computed::from_source(&settings, |settings: &ExamSettings| {
            percent_display(settings.percent_pass)
        });

        let exam_score_display = Computed::from3(
            &settings,
            &score,
            &marks,
            |settings: &ExamSettings, score: &f64, marks: &f64| {
                score_display(*score, *marks, settings.show_total_mark)
            },
        );

        let show_question_group_names = Computed::from_source(&settings, |s: &ExamSettings| {
            s.show_question_group_names
        });
        let allow_pause = Computed::from_source(&settings, |s: &ExamSettings| s.allow_pause);

        let start_time = formatted_time(&start);
        let end_time = formatted_time(&stop);

        let answered: Vec<ReadOnly<bool>> = questions.iter().map(QuestionView::answered).collect();
        let questions_attempted = {
            let deps: Vec<&dyn Node> = answered.iter().map(|cell| cell as &dyn Node).collect();
            let answered = answered.clone();
            Computed::from_fn(&deps, move || {
                answered.iter().filter(|cell| cell.get()).count()
            })
        };

        let questions_attempted_display = Computed::from2(
            &questions_attempted,
            &settings,
            |attempted: &usize, settings: &ExamSettings| {
                format!("{attempted} / {}", settings.num_questions)
            },
        );

        Self {
            source,
            disposed: false,
            settings,
            mode,
            saving,
            info_page,
            current_question,
            regenerating: Observable::new(false),
            confirm_leave: Observable::new(false),
            score,
            marks,
            percent_score: Observable::new(0.0),
            display_time: Observable::new(String::new()),
            time_spent: Observable::new(String::new()),
            start,
            stop,
            result: Observable::new(String::new()),
            passed: Observable::new(false),
            feedback_message: Observable::new(None),
            view_type,
            current_question_number,
            can_reverse,
            can_advance,
            percent_pass,
            exam_score_display,
            show_question_group_names,
            allow_pause,
            start_time,
            end_time,
            questions_attempted,
            questions_attempted_display,
            questions,
        }
    }

    #[must_use]
    pub fn settings(&self) -> ReadOnly<ExamSettings> {
        self.settings.read_only()
    }

    #[must_use]
    pub fn mode(&self) -> ReadOnly<ExamMode> {
        self.mode.read_only()
    }

    /// Whether progress is being saved.
    #[must_use]
    pub fn saving(&self) -> ReadOnly<bool> {
        self.saving.read_only()
    }

    #[must_use]
    pub fn info_page(&self) -> ReadOnly<Option<InfoPage>> {
        self.info_page.read_only()
    }

    #[must_use]
    pub fn current_question(&self) -> ReadOnly<Option<usize>> {
        self.current_question.read_only()
    }

    /// Set while the current question is being regenerated; the question
    /// pane is hidden meanwhile.
    #[must_use]
    pub fn regenerating(&self) -> ReadOnly<bool> {
        self.regenerating.read_only()
    }

    /// Whether leaving the page should ask for confirmation.
    #[must_use]
    pub fn confirm_leave(&self) -> ReadOnly<bool> {
        self.confirm_leave.read_only()
    }

    #[must_use]
    pub fn score(&self) -> ReadOnly<f64> {
        self.score.read_only()
    }

    #[must_use]
    pub fn marks(&self) -> ReadOnly<f64> {
        self.marks.read_only()
    }

    #[must_use]
    pub fn percent_score(&self) -> ReadOnly<f64> {
        self.percent_score.read_only()
    }

    /// Time remaining, or empty when hidden or untimed.
    #[must_use]
    pub fn display_time(&self) -> ReadOnly<String> {
        self.display_time.read_only()
    }

    #[must_use]
    pub fn time_spent(&self) -> ReadOnly<String> {
        self.time_spent.read_only()
    }

    #[must_use]
    pub fn result(&self) -> ReadOnly<String> {
        self.result.read_only()
    }

    #[must_use]
    pub fn passed(&self) -> ReadOnly<bool> {
        self.passed.read_only()
    }

    #[must_use]
    pub fn feedback_message(&self) -> ReadOnly<Option<String>> {
        self.feedback_message.read_only()
    }

    #[must_use]
    pub fn view_type(&self) -> Computed<ViewType> {
        self.view_type.clone()
    }

    #[must_use]
    pub fn current_question_number(&self) -> Computed<Option<usize>> {
        self.current_question_number.clone()
    }

    #[must_use]
    pub fn can_reverse(&self) -> Computed<bool> {
        self.can_reverse.clone()
    }

    #[must_use]
    pub fn can_advance(&self) -> Computed<bool> {
        self.can_advance.clone()
    }

    /// Pass mark as a percentage, e.g. `"40%"`.
    #[must_use]
    pub fn percent_pass(&self) -> Computed<String> {
        self.percent_pass.clone()
    }

    #[must_use]
    pub fn exam_score_display(&self) -> Computed<String> {
        self.exam_score_display.clone()
    }

    #[must_use]
    pub fn show_question_group_names(&self) -> Computed<bool> {
        self.show_question_group_names.clone()
    }

    #[must_use]
    pub fn allow_pause(&self) -> Computed<bool> {
        self.allow_pause.clone()
    }

    #[must_use]
    pub fn start_time(&self) -> Computed<String> {
        self.start_time.clone()
    }

    #[must_use]
    pub fn end_time(&self) -> Computed<String> {
        self.end_time.clone()
    }

    #[must_use]
    pub fn questions_attempted(&self) -> Computed<usize> {
        self.questions_attempted.clone()
    }

    /// `"attempted / total"`.
    #[must_use]
    pub fn questions_attempted_display(&self) -> Computed<String> {
        self.questions_attempted_display.clone()
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionView] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, number: usize) -> Option<&QuestionView> {
        self.questions.get(number)
    }

    /// The question being shown, if any.
    #[must_use]
    pub fn current(&self) -> Option<&QuestionView> {
        self.current_question.get().and_then(|n| self.questions.get(n))
    }

    pub fn set_saving(&self, saving: bool) {
        self.saving.set(saving);
    }

    /// Update the clock from the exam's timer.
    pub fn show_timing(&self) {
        let remaining = self.source.time_remaining();
        self.display_time
            .set(remaining.map(secs_to_display_time).unwrap_or_default());
        self.time_spent
            .set(secs_to_display_time(self.source.time_spent()));
    }

    pub fn hide_timing(&self) {
        self.display_time.set(String::new());
    }

    /// Pull the overall score.
    pub fn show_score(&self) {
        self.score.set(self.source.score());
        self.marks.set(self.source.marks());
        self.percent_score.set(self.source.percent_score());
    }

    /// Switch to an info page. No question is current afterwards.
    pub fn show_info_page(&self, page: InfoPage) {
        debug!(?page, "showing info page");
        self.confirm_leave.set(false);
        self.info_page.set(Some(page));
        self.current_question.set(None);

        let source = &self.source;
        match page {
            InfoPage::FrontPage => {
                self.marks.set(source.marks());
            }
            InfoPage::Result => {
                self.result.set(source.result());
                self.passed.set(source.passed());
                self.feedback_message.set(source.feedback_message());
                self.start.set(source.start_time());
                self.stop.set(source.stop_time());
            }
            InfoPage::Suspend => self.show_score(),
            InfoPage::Exit => {}
        }
    }

    /// Show the exam's current question.
    ///
    /// # Errors
    ///
    /// [`ViewError::Missing`] if the exam has no current question or it is
    /// out of range; [`ViewError::Disposed`] after dispose.
    pub fn show_question(&self) -> Result<()> {
        ensure_live(self.disposed, || "exam".to_owned())?;
        let number = self.current_number()?;
        let question = self.question_or_missing(number)?;

        self.info_page.set(None);
        self.current_question.set(Some(number));
        let settings = self.settings.get();
        self.confirm_leave
            .set(settings.prevent_leave && self.mode.get() != ExamMode::Review);

        question.refresh()?;
        question.show();
        debug!(number, "showing question");
        Ok(())
    }

    /// Hide the current question before it is regenerated.
    ///
    /// # Errors
    ///
    /// [`ViewError::Missing`] if no question is current.
    pub fn start_regen(&self) -> Result<()> {
        ensure_live(self.disposed, || "exam".to_owned())?;
        self.current_number()?;
        self.regenerating.set(true);
        Ok(())
    }

    /// Rebind the current question to its regenerated source and show it
    /// again.
    ///
    /// # Errors
    ///
    /// [`ViewError::Missing`] if no question is current or the regenerated
    /// question is absent from the exam.
    pub fn end_regen(&mut self) -> Result<()> {
        ensure_live(self.disposed, || "exam".to_owned())?;
        let number = self.current_number()?;
        let fresh = self
            .source
            .questions()
            .into_iter()
            .nth(number)
            .ok_or_else(|| Self::missing(number))?;
        let question = self
            .questions
            .get_mut(number)
            .ok_or_else(|| Self::missing(number))?;
        question.bind(fresh)?;
        question.show();
        self.regenerating.set(false);
        debug!(number, "question regenerated");
        Ok(())
    }

    /// Final update once the exam is over.
    ///
    /// # Errors
    ///
    /// [`ViewError::Disposed`] after dispose.
    pub fn end(&self) -> Result<()> {
        ensure_live(self.disposed, || "exam".to_owned())?;
        self.mode.set(self.source.mode());
        for question in &self.questions {
            question.end()?;
        }
        Ok(())
    }

    fn current_number(&self) -> Result<usize> {
        self.source.current_question().ok_or_else(|| ViewError::Missing {
            entity: "exam".into(),
            what: "current question".into(),
        })
    }

    fn question_or_missing(&self, number: usize) -> Result<&QuestionView> {
        self.questions.get(number).ok_or_else(|| Self::missing(number))
    }

    fn missing(number: usize) -> ViewError {
        ViewError::Missing {
            entity: "exam".into(),
            what: format!("question {}", number + 1),
        }
    }
}

impl ViewState for ExamView {
    type Source = dyn ExamSource;

    fn refresh(&self) -> Result<()> {
        ensure_live(self.disposed, || "exam".to_owned())?;
        let settings = self.source.settings();
        if settings != self.settings.get() {
            for question in &self.questions {
                question.apply_settings(&settings);
            }
        }
        self.settings.set(settings);
        self.mode.set(self.source.mode());
        if self.info_page.get().is_none() {
            let current = self
                .source
                .current_question()
                .filter(|&n| n < self.questions.len());
            self.current_question.set(current);
        }
        for question in &self.questions {
            question.refresh()?;
        }
        self.show_score();
        Ok(())
    }

    fn bind(&mut self, source: Rc<dyn ExamSource>) -> Result<()> {
        ensure_live(self.disposed, || "exam".to_owned())?;
        let sources: Vec<Rc<dyn QuestionSource>> = source.questions();
        if sources.len() != self.questions.len() {
            return Err(ViewError::Missing {
                entity: "exam".into(),
                what: format!("{} questions", self.questions.len()),
            });
        }
        for (question, fresh) in self.questions.iter_mut().zip(sources) {
            question.bind(fresh)?;
        }
        self.source = source;
        self.refresh()
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for question in &mut self.questions {
            question.dispose();
        }
        for cell in [
            &self.percent_pass,
            &self.exam_score_display,
            &self.start_time,
            &self.end_time,
            &self.questions_attempted_display,
        ] {
            cell.dispose();
        }
        self.view_type.dispose();
        self.current_question_number.dispose();
        self.can_reverse.dispose();
        self.can_advance.dispose();
        self.show_question_group_names.dispose();
        self.allow_pause.dispose();
        self.questions_attempted.dispose();
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
