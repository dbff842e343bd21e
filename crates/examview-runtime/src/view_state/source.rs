#![forbid(unsafe_code)]

//! Read-only accessors onto the exam domain model.
//!
//! The view layer never mutates the domain. Everything it shows is pulled
//! through these traits when a view is refreshed; everything the student
//! does goes back out as a [`DomainRequest`](crate::command::DomainRequest).

use std::rc::Rc;

use chrono::{DateTime, Local};

/// Exam-wide presentation and navigation settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExamSettings {
    /// Exam title.
    /// Default: empty.
    pub name: String,

    /// Number of questions in the exam.
    /// Default: 0.
    pub num_questions: usize,

    /// Whether the student may move back to earlier questions.
    /// Default: true.
    pub navigate_reverse: bool,

    /// Whether every question is listed in the menu before it is visited.
    /// Default: true.
    pub navigate_browse: bool,

    /// Show the marks available alongside scores.
    /// Default: true.
    pub show_total_mark: bool,

    /// Show the marks the student actually scored.
    /// Default: true.
    pub show_actual_mark: bool,

    /// Show tick/cross/partial indicators and marking feedback.
    /// Default: true.
    pub show_answer_state: bool,

    /// Fraction of the total needed to pass, in `0.0..=1.0`.
    /// Default: 0.0.
    pub percent_pass: f64,

    /// Show question group names in the question menu.
    /// Default: false.
    pub show_question_group_names: bool,

    /// Whether the exam may be paused.
    /// Default: true.
    pub allow_pause: bool,

    /// Whether the student may reveal answers.
    /// Default: true.
    pub allow_reveal_answer: bool,

    /// Whether the student may regenerate a question.
    /// Default: true.
    pub allow_regen: bool,

    /// Ask for confirmation before leaving a running exam.
    /// Default: false.
    pub prevent_leave: bool,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            num_questions: 0,
            navigate_reverse: true,
            navigate_browse: true,
            show_total_mark: true,
            show_actual_mark: true,
            show_answer_state: true,
            percent_pass: 0.0,
            show_question_group_names: false,
            allow_pause: true,
            allow_reveal_answer: true,
            allow_regen: true,
            prevent_leave: false,
        }
    }
}

impl ExamSettings {
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_num_questions(mut self, count: usize) -> Self {
        self.num_questions = count;
        self
    }

    #[must_use]
    pub fn with_navigate_reverse(mut self, allowed: bool) -> Self {
        self.navigate_reverse = allowed;
        self
    }

    #[must_use]
    pub fn with_show_total_mark(mut self, show: bool) -> Self {
        self.show_total_mark = show;
        self
    }

    #[must_use]
    pub fn with_show_actual_mark(mut self, show: bool) -> Self {
        self.show_actual_mark = show;
        self
    }

    #[must_use]
    pub fn with_show_answer_state(mut self, show: bool) -> Self {
        self.show_answer_state = show;
        self
    }

    #[must_use]
    pub fn with_percent_pass(mut self, fraction: f64) -> Self {
        self.percent_pass = fraction;
        self
    }
}

/// Whether the exam is being sat or reviewed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExamMode {
    #[default]
    Normal,
    Review,
}

/// The kind of a question part. Each kind has its own display behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Mathematical expression entry with a live typeset preview.
    Jme,
    PatternMatch,
    NumberEntry,
    MultipleResponse(ChoiceLayout),
    GapFill,
    /// Text only; nothing to answer.
    Information,
}

/// How a multiple-response part lays out its choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChoiceLayout {
    #[default]
    RadioGroup,
    Checkbox,
    DropDownList,
}

/// One step of the marking script's output.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkingAction {
    pub op: MarkingOp,
    /// The gap this action refers to, for gap-fill parts.
    pub gap: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkingOp {
    /// Award `credit` (a fraction of the available marks; may be negative).
    AddCredit(f64),
    /// A message with no effect on the score.
    Note,
}

impl MarkingAction {
    #[must_use]
    pub fn credit(credit: f64, message: impl Into<String>) -> Self {
        Self {
            op: MarkingOp::AddCredit(credit),
            gap: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            op: MarkingOp::Note,
            gap: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_gap(mut self, gap: usize) -> Self {
        self.gap = Some(gap);
        self
    }
}

/// Read access to the exam.
pub trait ExamSource {
    fn settings(&self) -> ExamSettings;
    fn mode(&self) -> ExamMode;
    fn score(&self) -> f64;
    fn marks(&self) -> f64;
    /// Score as a percentage of the total.
    fn percent_score(&self) -> f64;
    /// Seconds left, or `None` for an untimed exam.
    fn time_remaining(&self) -> Option<f64>;
    fn time_spent(&self) -> f64;
    /// Index of the question being shown, if any.
    fn current_question(&self) -> Option<usize>;
    fn questions(&self) -> Vec<Rc<dyn QuestionSource>>;
    fn result(&self) -> String;
    fn passed(&self) -> bool;
    fn feedback_message(&self) -> Option<String>;
    fn start_time(&self) -> Option<DateTime<Local>>;
    fn stop_time(&self) -> Option<DateTime<Local>>;
}

/// Read access to one question.
pub trait QuestionSource {
    /// Zero-based position in the exam.
    fn number(&self) -> usize;
    fn name(&self) -> String;
    fn score(&self) -> f64;
    fn marks(&self) -> f64;
    fn answered(&self) -> bool;
    fn visited(&self) -> bool;
    fn advice_displayed(&self) -> bool;
    fn revealed(&self) -> bool;
    fn parts(&self) -> Vec<Rc<dyn PartSource>>;
}

/// Read access to one part, gap or step.
///
/// Kind-specific accessors have empty defaults so sources only implement
/// what their kind uses.
pub trait PartSource {
    /// Unique path such as `p0`, `p1g0` or `p2s1`.
    fn path(&self) -> String;
    fn kind(&self) -> PartKind;
    fn score(&self) -> f64;
    fn marks(&self) -> f64;
    fn answered(&self) -> bool;

    /// Whether this is a gap or a step rather than a top-level part.
    fn has_parent(&self) -> bool {
        false
    }

    fn steps_shown(&self) -> bool {
        false
    }

    /// Marks lost once steps are shown.
    fn steps_penalty(&self) -> f64 {
        0.0
    }

    /// The student's last stored answer for text-entry kinds.
    fn student_answer(&self) -> String {
        String::new()
    }

    /// The answer to fill in on reveal for text-entry kinds.
    fn display_answer(&self) -> String {
        String::new()
    }

    /// Ticked cells for multiple-response parts, `ticks[answer][choice]`.
    fn ticks(&self) -> Vec<Vec<bool>> {
        Vec::new()
    }

    /// Marks per cell for multiple-response parts, `matrix[answer][choice]`.
    fn choice_matrix(&self) -> Vec<Vec<f64>> {
        Vec::new()
    }

    fn gaps(&self) -> Vec<Rc<dyn PartSource>> {
        Vec::new()
    }

    fn steps(&self) -> Vec<Rc<dyn PartSource>> {
        Vec::new()
    }

    fn marking_feedback(&self) -> Vec<MarkingAction> {
        Vec::new()
    }
}
