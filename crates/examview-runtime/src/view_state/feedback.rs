#![forbid(unsafe_code)]

//! Score feedback shown next to questions and parts.

use std::fmt;

use super::format::{marks_string, nice_number, pluralise};
use super::source::{ExamSettings, MarkingAction, MarkingOp};

/// The subset of [`ExamSettings`] that decides what score feedback reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackPolicy {
    pub show_total_mark: bool,
    pub show_actual_mark: bool,
    pub show_answer_state: bool,
}

impl Default for FeedbackPolicy {
    fn default() -> Self {
        Self {
            show_total_mark: true,
            show_actual_mark: true,
            show_answer_state: true,
        }
    }
}

impl From<&ExamSettings> for FeedbackPolicy {
    fn from(settings: &ExamSettings) -> Self {
        Self {
            show_total_mark: settings.show_total_mark,
            show_actual_mark: settings.show_actual_mark,
            show_answer_state: settings.show_answer_state,
        }
    }
}

/// What the score box says.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreFeedback {
    /// Nothing to show.
    Hidden,
    /// Not answered yet; the marks available are shown.
    Unanswered { marks: f64 },
    /// Answered; neither score nor total may be shown.
    Answered,
    /// Answered; only the marks available may be shown.
    AnsweredTotal { marks: f64 },
    /// Answered; only the score may be shown.
    AnsweredActual { score: f64 },
    /// Answered; score out of total.
    AnsweredTotalActual { score: f64, marks: f64 },
}

impl ScoreFeedback {
    /// Feedback for an item with `score` out of `marks`.
    ///
    /// A positive score counts as answered even if the item was never
    /// submitted.
    #[must_use]
    pub fn for_score(answered: bool, score: f64, marks: f64, policy: FeedbackPolicy) -> Self {
        let answered = answered || score > 0.0;
        match (answered, policy.show_total_mark, policy.show_actual_mark) {
            (true, true, true) => Self::AnsweredTotalActual { score, marks },
            (true, true, false) => Self::AnsweredTotal { marks },
            (true, false, true) => Self::AnsweredActual { score },
            (true, false, false) => Self::Answered,
            (false, true, _) => Self::Unanswered { marks },
            (false, false, _) => Self::Hidden,
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

impl fmt::Display for ScoreFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Hidden => Ok(()),
            Self::Unanswered { marks } => f.write_str(&marks_string(marks)),
            Self::Answered => f.write_str("Answered"),
            Self::AnsweredTotal { marks } => write!(f, "Answered ({})", marks_string(marks)),
            Self::AnsweredActual { score } => write!(f, "Score: {}", nice_number(score)),
            Self::AnsweredTotalActual { score, marks } => {
                write!(f, "Score: {}/{}", nice_number(score), nice_number(marks))
            }
        }
    }
}

/// Tick, cross or partial indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState {
    Cross,
    Partial,
    Tick,
}

impl AnswerState {
    /// The indicator for an answered item, or `None` when it is hidden.
    #[must_use]
    pub fn for_score(answered: bool, score: f64, marks: f64, policy: FeedbackPolicy) -> Option<Self> {
        let answered = answered || score > 0.0;
        if !policy.show_answer_state || !answered {
            return None;
        }
        Some(if score <= 0.0 {
            Self::Cross
        } else if (score - marks).abs() < f64::EPSILON {
            Self::Tick
        } else {
            Self::Partial
        })
    }
}

/// Messages for the marking feedback box of a part.
///
/// Each credit action is scaled by the marks available (less the steps
/// penalty once steps have been shown), and by the gap's share of the marks
/// for gap actions. Actions with an empty message produce nothing.
#[must_use]
pub fn marking_feedback_messages(
    actions: &[MarkingAction],
    marks: f64,
    steps_penalty: f64,
    gap_marks: &[f64],
) -> Vec<String> {
    let max_marks = marks - steps_penalty;
    actions
        .iter()
        .filter_map(|action| {
            let mut change = match action.op {
                MarkingOp::AddCredit(credit) => credit * max_marks,
                MarkingOp::Note => 0.0,
            };
            if let (Some(gap), true) = (action.gap, marks > 0.0) {
                if let Some(&gap_marks) = gap_marks.get(gap) {
                    change *= gap_marks / marks;
                }
            }
            let mut message = action.message.trim().to_owned();
            if message.is_empty() {
                return None;
            }
            let amount = change.abs();
            let awarded = format!("{} {}", nice_number(amount), pluralise(amount, "mark", "marks"));
            if change > 0.0 {
                message.push_str(&format!("\n\nYou were awarded {awarded}."));
            } else if change < 0.0 {
                let verb = pluralise(amount, "was", "were");
                message.push_str(&format!("\n\n{awarded} {verb} taken away."));
            }
            Some(message)
        })
        .collect()
}
