#![forbid(unsafe_code)]

//! View state for question parts, gaps and steps.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::feedback::{AnswerState, FeedbackPolicy, ScoreFeedback, marking_feedback_messages};
use super::source::{ChoiceLayout, MarkingAction, PartKind, PartSource};
use super::{Result, ViewState, ensure_live};
use crate::reactive::{Computed, Node, Observable, ReadOnly};

/// What the answer inputs of a part currently hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AnswerInput {
    #[default]
    None,
    Text(String),
    /// Ticked cells, `choices[answer][choice]`.
    Choices(Vec<Vec<bool>>),
}

// ---------------------------------------------------------------------------
// JME preview
// ---------------------------------------------------------------------------

/// Turns a typed expression into typeset markup.
pub trait ExprRenderer {
    /// # Errors
    ///
    /// A message describing why `expr` cannot be rendered.
    fn to_latex(&self, expr: &str) -> std::result::Result<String, String>;
}

impl<F> ExprRenderer for F
where
    F: Fn(&str) -> std::result::Result<String, String>,
{
    fn to_latex(&self, expr: &str) -> std::result::Result<String, String> {
        self(expr)
    }
}

/// Result of [`JmePreview::flush`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewFlush {
    /// Nothing was waiting.
    Idle,
    /// The waiting text is what is already shown.
    Unchanged,
    /// The preview now shows the rendered text.
    Rendered(String),
    /// The text could not be rendered; the preview is cleared.
    Invalid { text: String, error: String },
}

/// Live typeset preview of an expression being typed.
///
/// Keystrokes are coalesced: [`input`](Self::input) only records the
/// latest text, and the host calls [`flush`](Self::flush) when it is ready
/// to render (typically from a short timer opened by the first keystroke).
#[derive(Debug, Default)]
pub struct JmePreview {
    tex: Observable<String>,
    valid: Observable<bool>,
    pending: RefCell<Option<String>>,
    force: Cell<bool>,
    shown: RefCell<Option<String>>,
}

impl JmePreview {
    #[must_use]
    pub fn new() -> Self {
        Self {
            valid: Observable::new(true),
            ..Self::default()
        }
    }

    /// Record typed text. Returns `true` when this opens a new window, i.e.
    /// the host should schedule a flush.
    pub fn input(&self, text: impl Into<String>) -> bool {
        let mut pending = self.pending.borrow_mut();
        let opened = pending.is_none();
        *pending = Some(text.into());
        opened
    }

    /// Record `text` and render it on the next flush even if it is already
    /// shown.
    pub fn request_render(&self, text: impl Into<String>) -> bool {
        self.force.set(true);
        self.input(text)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Render the latest recorded text.
    pub fn flush(&self, renderer: &dyn ExprRenderer) -> PreviewFlush {
        let Some(text) = self.pending.borrow_mut().take() else {
            return PreviewFlush::Idle;
        };
        let forced = self.force.replace(false);
        if !forced && self.shown.borrow().as_deref() == Some(text.as_str()) {
            return PreviewFlush::Unchanged;
        }
        *self.shown.borrow_mut() = Some(text.clone());

        if text.is_empty() {
            self.tex.set(String::new());
            self.valid.set(true);
            return PreviewFlush::Rendered(text);
        }
        match renderer.to_latex(&text) {
            Ok(tex) => {
                self.tex.set(tex);
                self.valid.set(true);
                PreviewFlush::Rendered(text)
            }
            Err(error) => {
                debug!(%text, %error, "expression preview failed");
                self.tex.set(String::new());
                self.valid.set(false);
                PreviewFlush::Invalid { text, error }
            }
        }
    }

    /// Typeset markup currently shown.
    #[must_use]
    pub fn tex(&self) -> ReadOnly<String> {
        self.tex.read_only()
    }

    /// Whether the shown text rendered.
    #[must_use]
    pub fn valid(&self) -> ReadOnly<bool> {
        self.valid.read_only()
    }
}

// ---------------------------------------------------------------------------
// Per-kind display behavior
// ---------------------------------------------------------------------------

/// Kind-specific display behavior of a part.
///
/// [`PartView`] handles everything common to all kinds and dispatches the
/// rest to the implementation returned by [`PartKind::display`].
pub trait PartDisplay {
    /// Called when the part is shown.
    fn show(&self, part: &PartView) {
        self.restore_answer(part);
    }

    /// Put the student's stored answer back into the inputs.
    fn restore_answer(&self, part: &PartView) {
        part.answer.set(AnswerInput::Text(part.source.student_answer()));
    }

    /// Fill the inputs with the correct answer.
    fn reveal_answer(&self, part: &PartView) {
        part.answer.set(AnswerInput::Text(part.source.display_answer()));
    }
}

struct JmeDisplay;
struct TextEntryDisplay;
struct MultipleResponseDisplay(ChoiceLayout);
struct GapFillDisplay;
struct InformationDisplay;

impl PartDisplay for JmeDisplay {
    fn show(&self, part: &PartView) {
        self.restore_answer(part);
        if let Some(preview) = part.preview.as_ref() {
            preview.request_render(part.source.student_answer());
        }
    }

    fn reveal_answer(&self, part: &PartView) {
        let correct = part.source.display_answer();
        if let Some(preview) = part.preview.as_ref() {
            preview.request_render(correct.clone());
        }
        part.answer.set(AnswerInput::Text(correct));
    }
}

impl PartDisplay for TextEntryDisplay {}

impl PartDisplay for MultipleResponseDisplay {
    fn restore_answer(&self, part: &PartView) {
        part.answer.set(AnswerInput::Choices(part.source.ticks()));
    }

    fn reveal_answer(&self, part: &PartView) {
        let matrix = part.source.choice_matrix();
        let choices = match self.0 {
            ChoiceLayout::RadioGroup | ChoiceLayout::Checkbox => matrix
                .iter()
                .map(|row| row.iter().map(|&marks| marks > 0.0).collect())
                .collect(),
            ChoiceLayout::DropDownList => {
                // The highest-scoring answer is selected; ties keep the first.
                let mut best = None;
                let mut best_marks = 0.0;
                for (i, row) in matrix.iter().enumerate() {
                    let marks = row.first().copied().unwrap_or(0.0);
                    if marks > best_marks {
                        best_marks = marks;
                        best = Some(i);
                    }
                }
                (0..matrix.len()).map(|i| vec![Some(i) == best]).collect()
            }
        };
        part.answer.set(AnswerInput::Choices(choices));
    }
}

impl PartDisplay for GapFillDisplay {
    fn show(&self, part: &PartView) {
        for gap in &part.gaps {
            gap.show();
        }
    }

    fn restore_answer(&self, part: &PartView) {
        for gap in &part.gaps {
            gap.restore_answer();
        }
    }

    fn reveal_answer(&self, part: &PartView) {
        for gap in &part.gaps {
            gap.reveal_answer();
        }
    }
}

impl PartDisplay for InformationDisplay {
    fn restore_answer(&self, part: &PartView) {
        part.answer.set(AnswerInput::None);
    }

    fn reveal_answer(&self, _part: &PartView) {}
}

impl PartKind {
    /// Display behavior for this kind.
    #[must_use]
    pub fn display(self) -> &'static dyn PartDisplay {
        match self {
            Self::Jme => &JmeDisplay,
            Self::PatternMatch | Self::NumberEntry => &TextEntryDisplay,
            Self::MultipleResponse(ChoiceLayout::RadioGroup) => {
                &MultipleResponseDisplay(ChoiceLayout::RadioGroup)
            }
            Self::MultipleResponse(ChoiceLayout::Checkbox) => {
                &MultipleResponseDisplay(ChoiceLayout::Checkbox)
            }
            Self::MultipleResponse(ChoiceLayout::DropDownList) => {
                &MultipleResponseDisplay(ChoiceLayout::DropDownList)
            }
            Self::GapFill => &GapFillDisplay,
            Self::Information => &InformationDisplay,
        }
    }
}

// ---------------------------------------------------------------------------
// PartView
// ---------------------------------------------------------------------------

/// View state for one part, gap or step.
pub struct PartView {
    source: Rc<dyn PartSource>,
    path: String,
    kind: PartKind,
    disposed: bool,

    policy: Observable<FeedbackPolicy>,
    revealed: Observable<bool>,
    score: Observable<f64>,
    marks: Observable<f64>,
    answered: Observable<bool>,
    steps_shown: Observable<bool>,
    steps_penalty: Observable<f64>,
    marking: Observable<Vec<MarkingAction>>,
    gap_marks: Observable<Vec<f64>>,
    warnings: Observable<Vec<String>>,
    answer: Observable<AnswerInput>,
    input_disabled: Observable<bool>,

    score_feedback: Computed<ScoreFeedback>,
    answer_state: Computed<Option<AnswerState>>,
    feedback_visible: Computed<bool>,
    feedback_messages: Computed<Vec<String>>,

    preview: Option<JmePreview>,
    gaps: Vec<PartView>,
    steps: Vec<PartView>,
}

impl fmt::Debug for PartView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartView")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("score", &self.score.get())
            .field("marks", &self.marks.get())
            .field("answered", &self.answered.get())
            .field("gaps", &self.gaps.len())
            .field("steps", &self.steps.len())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl PartView {
    /// Build the view for `source`.
    ///
    /// `sole_part` marks a top-level part that is its question's only part;
    /// such a part has no separate feedback box.
    pub fn new(
        source: Rc<dyn PartSource>,
        policy: FeedbackPolicy,
        revealed: bool,
        sole_part: bool,
    ) -> Self {
        let policy = Observable::new(policy);
        let revealed = Observable::new(revealed);
        let score = Observable::new(source.score());
        let marks = Observable::new(source.marks());
        let answered = Observable::new(source.answered());
        let steps_shown = Observable::new(source.steps_shown());
        let steps_penalty = Observable::new(source.steps_penalty());
        let marking = Observable::new(source.marking_feedback());
        let gaps: Vec<PartView> = source
            .gaps()
            .into_iter()
            .map(|gap| PartView::new(gap, policy.get(), revealed.get(), false))
            .collect();
        let gap_marks: Observable<Vec<f64>> =
            Observable::new(gaps.iter().map(|gap| gap.marks.get()).collect());
        let steps = source
            .steps()
            .into_iter()
            .map(|step| PartView::new(step, policy.get(), revealed.get(), false))
            .collect();

        let score_feedback = {
            let deps: [&dyn Node; 5] = [&policy, &revealed, &answered, &score, &marks];
            let (policy, revealed, answered, score, marks) = (
                policy.clone(),
                revealed.clone(),
                answered.clone(),
                score.clone(),
                marks.clone(),
            );
            Computed::from_fn(&deps, move || {
                let marks = marks.get();
                if revealed.get() {
                    ScoreFeedback::for_score(false, 0.0, marks, policy.get())
                } else if marks == 0.0 {
                    ScoreFeedback::Hidden
                } else {
                    ScoreFeedback::for_score(answered.get(), score.get(), marks, policy.get())
                }
            })
        };

        let answer_state = {
            let deps: [&dyn Node; 5] = [&policy, &revealed, &answered, &score, &marks];
            let (policy, revealed, answered, score, marks) = (
                policy.clone(),
                revealed.clone(),
                answered.clone(),
                score.clone(),
                marks.clone(),
            );
            Computed::from_fn(&deps, move || {
                if revealed.get() || marks.get() == 0.0 {
                    return None;
                }
                AnswerState::for_score(answered.get(), score.get(), marks.get(), policy.get())
            })
        };

        let feedback_visible = Computed::from2(&revealed, &marks, move |revealed: &bool, marks: &f64| {
            !sole_part && (*revealed || *marks != 0.0)
        });

        let feedback_messages = {
            let deps: [&dyn Node; 7] = [
                &policy,
                &revealed,
                &marks,
                &steps_shown,
                &steps_penalty,
                &marking,
                &gap_marks,
            ];
            let (policy, revealed, marks, steps_shown, steps_penalty, marking, gap_marks) = (
                policy.clone(),
                revealed.clone(),
                marks.clone(),
                steps_shown.clone(),
                steps_penalty.clone(),
                marking.clone(),
                gap_marks.clone(),
            );
            Computed::from_fn(&deps, move || {
                if !policy.get().show_answer_state || revealed.get() {
                    return Vec::new();
                }
                let penalty = if steps_shown.get() { steps_penalty.get() } else { 0.0 };
                marking.with(|actions| {
                    gap_marks.with(|gaps| marking_feedback_messages(actions, marks.get(), penalty, gaps))
                })
            })
        };

        let kind = source.kind();
        Self {
            path: source.path(),
            preview: (kind == PartKind::Jme).then(JmePreview::new),
            kind,
            source,
            disposed: false,
            policy,
            revealed,
            score,
            marks,
            answered,
            steps_shown,
            steps_penalty,
            marking,
            gap_marks,
            warnings: Observable::new(Vec::new()),
            answer: Observable::default(),
            input_disabled: Observable::new(false),
            score_feedback,
            answer_state,
            feedback_visible,
            feedback_messages,
            gaps,
            steps,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> PartKind {
        self.kind
    }

    #[must_use]
    pub fn gaps(&self) -> &[PartView] {
        &self.gaps
    }

    #[must_use]
    pub fn steps(&self) -> &[PartView] {
        &self.steps
    }

    /// This part, or the gap or step below it with the given path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&PartView> {
        if self.path == path {
            return Some(self);
        }
        self.gaps
            .iter()
            .chain(&self.steps)
            .find_map(|child| child.find(path))
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
    pub fn answered(&self) -> ReadOnly<bool> {
        self.answered.read_only()
    }

    #[must_use]
    pub fn steps_shown(&self) -> ReadOnly<bool> {
        self.steps_shown.read_only()
    }

    #[must_use]
    pub fn warnings(&self) -> ReadOnly<Vec<String>> {
        self.warnings.read_only()
    }

    #[must_use]
    pub fn answer(&self) -> ReadOnly<AnswerInput> {
        self.answer.read_only()
    }

    #[must_use]
    pub fn input_disabled(&self) -> ReadOnly<bool> {
        self.input_disabled.read_only()
    }

    #[must_use]
    pub fn score_feedback(&self) -> Computed<ScoreFeedback> {
        self.score_feedback.clone()
    }

    #[must_use]
    pub fn answer_state(&self) -> Computed<Option<AnswerState>> {
        self.answer_state.clone()
    }

    /// Whether the part's own feedback box is shown.
    #[must_use]
    pub fn feedback_visible(&self) -> Computed<bool> {
        self.feedback_visible.clone()
    }

    #[must_use]
    pub fn feedback_messages(&self) -> Computed<Vec<String>> {
        self.feedback_messages.clone()
    }

    /// The live preview, for expression parts.
    #[must_use]
    pub fn preview(&self) -> Option<&JmePreview> {
        self.preview.as_ref()
    }

    /// Show a validation warning next to the part.
    pub fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        self.warnings.update(|warnings| warnings.push(message));
    }

    pub fn remove_warnings(&self) {
        self.warnings.set(Vec::new());
    }

    /// Record typed text for the live preview. Returns `true` when the host
    /// should schedule a flush. Non-expression parts ignore this.
    pub fn input(&self, text: impl Into<String>) -> bool {
        match self.preview.as_ref() {
            Some(preview) => preview.input(text),
            None => false,
        }
    }

    /// Render the coalesced preview text, replacing warnings with the
    /// render error if there is one.
    pub fn flush_preview(&self, renderer: &dyn ExprRenderer) -> PreviewFlush {
        let Some(preview) = self.preview.as_ref() else {
            return PreviewFlush::Idle;
        };
        let outcome = preview.flush(renderer);
        match &outcome {
            PreviewFlush::Rendered(_) => self.remove_warnings(),
            PreviewFlush::Invalid { error, .. } => {
                self.remove_warnings();
                self.warning(error.clone());
            }
            PreviewFlush::Idle | PreviewFlush::Unchanged => {}
        }
        outcome
    }

    /// Show the part: steps when already opened, the stored answer, then
    /// kind-specific behavior.
    pub fn show(&self) {
        if self.steps_shown.get() {
            for step in &self.steps {
                step.show();
            }
        }
        self.kind.display().show(self);
        if self.revealed.get() {
            self.reveal_answer();
        }
    }

    pub fn restore_answer(&self) {
        self.kind.display().restore_answer(self);
    }

    /// Replace the inputs with the correct answer and lock them.
    pub fn reveal_answer(&self) {
        self.remove_warnings();
        self.input_disabled.set(true);
        self.kind.display().reveal_answer(self);
    }

    pub(crate) fn set_revealed(&self, revealed: bool) {
        self.revealed.set(revealed);
        for child in self.gaps.iter().chain(&self.steps) {
            child.set_revealed(revealed);
        }
    }

    pub(crate) fn set_policy(&self, policy: FeedbackPolicy) {
        self.policy.set(policy);
        for child in self.gaps.iter().chain(&self.steps) {
            child.set_policy(policy);
        }
    }

    fn rebind_children(
        children: &mut Vec<PartView>,
        sources: Vec<Rc<dyn PartSource>>,
        policy: FeedbackPolicy,
        revealed: bool,
    ) -> Result<()> {
        if children.len() != sources.len() {
            for child in children.iter_mut() {
                child.dispose();
            }
            *children = sources
                .into_iter()
                .map(|source| PartView::new(source, policy, revealed, false))
                .collect();
            return Ok(());
        }
        for (child, source) in children.iter_mut().zip(sources) {
            child.bind(source)?;
        }
        Ok(())
    }
}

impl ViewState for PartView {
    type Source = dyn PartSource;

    fn refresh(&self) -> Result<()> {
        ensure_live(self.disposed, || format!("part {}", self.path))?;
        for child in self.gaps.iter().chain(&self.steps) {
            child.refresh()?;
        }
        let source = &self.source;
        self.score.set(source.score());
        self.marks.set(source.marks());
        self.answered.set(source.answered());
        self.steps_shown.set(source.steps_shown());
        self.steps_penalty.set(source.steps_penalty());
        self.marking.set(source.marking_feedback());
        self.gap_marks
            .set(self.gaps.iter().map(|gap| gap.marks.get()).collect());
        Ok(())
    }

    fn bind(&mut self, source: Rc<dyn PartSource>) -> Result<()> {
        ensure_live(self.disposed, || format!("part {}", self.path))?;
        let (policy, revealed) = (self.policy.get(), self.revealed.get());
        Self::rebind_children(&mut self.gaps, source.gaps(), policy, revealed)?;
        Self::rebind_children(&mut self.steps, source.steps(), policy, revealed)?;
        self.path = source.path();
        self.kind = source.kind();
        if self.kind == PartKind::Jme && self.preview.is_none() {
            self.preview = Some(JmePreview::new());
        }
        self.source = source;
        self.input_disabled.set(false);
        self.remove_warnings();
        self.refresh()
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for child in self.gaps.iter_mut().chain(self.steps.iter_mut()) {
            child.dispose();
        }
        self.score_feedback.dispose();
        self.answer_state.dispose();
        self.feedback_visible.dispose();
        self.feedback_messages.dispose();
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::view_state::ViewError;

    /// In-memory part for tests.
    #[derive(Debug, Clone)]
    pub(crate) struct FakePart {
        pub path: String,
        pub kind: PartKind,
        pub score: f64,
        pub marks: f64,
        pub answered: bool,
        pub steps_shown: bool,
        pub steps_penalty: f64,
        pub student_answer: String,
        pub display_answer: String,
        pub ticks: Vec<Vec<bool>>,
        pub matrix: Vec<Vec<f64>>,
        pub gaps: Vec<Rc<FakePart>>,
        pub steps: Vec<Rc<FakePart>>,
        pub marking: Vec<MarkingAction>,
    }

    impl FakePart {
        pub(crate) fn new(path: &str, kind: PartKind, marks: f64) -> Self {
            Self {
                path: path.into(),
                kind,
                score: 0.0,
                marks,
                answered: false,
                steps_shown: false,
                steps_penalty: 0.0,
                student_answer: String::new(),
                display_answer: String::new(),
                ticks: Vec::new(),
                matrix: Vec::new(),
                gaps: Vec::new(),
                steps: Vec::new(),
                marking: Vec::new(),
            }
        }

        pub(crate) fn scored(mut self, score: f64) -> Self {
            self.score = score;
            self.answered = true;
            self
        }
    }

    impl PartSource for FakePart {
        fn path(&self) -> String {
            self.path.clone()
        }
        fn kind(&self) -> PartKind {
            self.kind
        }
        fn score(&self) -> f64 {
            self.score
        }
        fn marks(&self) -> f64 {
            self.marks
        }
        fn answered(&self) -> bool {
            self.answered
        }
        fn steps_shown(&self) -> bool {
            self.steps_shown
        }
        fn steps_penalty(&self) -> f64 {
            self.steps_penalty
        }
        fn student_answer(&self) -> String {
            self.student_answer.clone()
        }
        fn display_answer(&self) -> String {
            self.display_answer.clone()
        }
        fn ticks(&self) -> Vec<Vec<bool>> {
            self.ticks.clone()
        }
        fn choice_matrix(&self) -> Vec<Vec<f64>> {
            self.matrix.clone()
        }
        fn gaps(&self) -> Vec<Rc<dyn PartSource>> {
            self.gaps
                .iter()
                .map(|g| Rc::clone(g) as Rc<dyn PartSource>)
                .collect()
        }
        fn steps(&self) -> Vec<Rc<dyn PartSource>> {
            self.steps
                .iter()
                .map(|s| Rc::clone(s) as Rc<dyn PartSource>)
                .collect()
        }
        fn marking_feedback(&self) -> Vec<MarkingAction> {
            self.marking.clone()
        }
    }

    /// A part whose fields can change between refreshes.
    struct LivePart(RefCell<FakePart>);

    impl PartSource for LivePart {
        fn path(&self) -> String {
            self.0.borrow().path.clone()
        }
        fn kind(&self) -> PartKind {
            self.0.borrow().kind
        }
        fn score(&self) -> f64 {
            self.0.borrow().score
        }
        fn marks(&self) -> f64 {
            self.0.borrow().marks
        }
        fn answered(&self) -> bool {
            self.0.borrow().answered
        }
    }

    fn view(part: FakePart) -> PartView {
        PartView::new(Rc::new(part), FeedbackPolicy::default(), false, false)
    }

    fn latex(expr: &str) -> std::result::Result<String, String> {
        if expr.contains('(') && !expr.contains(')') {
            Err(format!("unbalanced brackets in {expr}"))
        } else {
            Ok(format!("\\({expr}\\)"))
        }
    }

    #[test]
    fn score_feedback_follows_score() {
        let part = view(FakePart::new("p0", PartKind::NumberEntry, 2.0).scored(2.0));
        assert_eq!(
            part.score_feedback().get(),
            ScoreFeedback::AnsweredTotalActual { score: 2.0, marks: 2.0 }
        );
        assert_eq!(part.answer_state().get(), Some(AnswerState::Tick));
        assert!(part.feedback_visible().get());
    }

    #[test]
    fn zero_mark_part_hides_feedback() {
        let part = view(FakePart::new("p0", PartKind::Information, 0.0));
        assert_eq!(part.score_feedback().get(), ScoreFeedback::Hidden);
        assert!(!part.feedback_visible().get());
    }

    #[test]
    fn sole_part_has_no_feedback_box() {
        let part = PartView::new(
            Rc::new(FakePart::new("p0", PartKind::NumberEntry, 1.0)),
            FeedbackPolicy::default(),
            false,
            true,
        );
        assert!(!part.feedback_visible().get());
    }

    #[test]
    fn revealed_part_shows_unanswered_total() {
        let part = view(FakePart::new("p0", PartKind::NumberEntry, 3.0).scored(1.0));
        part.set_revealed(true);
        assert_eq!(part.score_feedback().get(), ScoreFeedback::Unanswered { marks: 3.0 });
        assert_eq!(part.answer_state().get(), None);
    }

    #[test]
    fn refresh_pulls_changes_and_is_idempotent() {
        let live = Rc::new(LivePart(RefCell::new(FakePart::new(
            "p0",
            PartKind::NumberEntry,
            4.0,
        ))));
        let part = PartView::new(live.clone(), FeedbackPolicy::default(), false, false);
        let feedback = part.score_feedback();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let _sub = feedback.subscribe(move |_| counter.set(counter.get() + 1));

        part.refresh().unwrap();
        assert_eq!(seen.get(), 0);

        {
            let mut inner = live.0.borrow_mut();
            inner.score = 3.0;
            inner.answered = true;
        }
        part.refresh().unwrap();
        assert_eq!(seen.get(), 1);
        assert_eq!(
            feedback.get(),
            ScoreFeedback::AnsweredTotalActual { score: 3.0, marks: 4.0 }
        );

        part.refresh().unwrap();
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn marking_messages_respect_steps_penalty() {
        let mut source = FakePart::new("p0", PartKind::NumberEntry, 3.0).scored(2.0);
        source.steps_shown = true;
        source.steps_penalty = 1.0;
        source.marking = vec![MarkingAction::credit(1.0, "Correct.")];
        let part = view(source);
        assert_eq!(
            part.feedback_messages().get(),
            vec!["Correct.\n\nYou were awarded 2 marks.".to_owned()]
        );
    }

    #[test]
    fn text_parts_restore_and_reveal() {
        let mut source = FakePart::new("p0", PartKind::PatternMatch, 1.0);
        source.student_answer = "abc".into();
        source.display_answer = "xyz".into();
        let part = view(source);
        part.show();
        assert_eq!(part.answer().get(), AnswerInput::Text("abc".into()));
        assert!(!part.input_disabled().get());

        part.warning("bad");
        part.reveal_answer();
        assert_eq!(part.answer().get(), AnswerInput::Text("xyz".into()));
        assert!(part.input_disabled().get());
        assert!(part.warnings().get().is_empty());
    }

    #[test]
    fn multiple_response_reveal_by_layout() {
        let mut source = FakePart::new(
            "p0",
            PartKind::MultipleResponse(ChoiceLayout::Checkbox),
            2.0,
        );
        source.ticks = vec![vec![true], vec![false], vec![false]];
        source.matrix = vec![vec![1.0], vec![0.0], vec![1.0]];
        let part = view(source.clone());
        part.show();
        assert_eq!(part.answer().get(), AnswerInput::Choices(source.ticks.clone()));
        part.reveal_answer();
        assert_eq!(
            part.answer().get(),
            AnswerInput::Choices(vec![vec![true], vec![false], vec![true]])
        );

        source.kind = PartKind::MultipleResponse(ChoiceLayout::DropDownList);
        source.matrix = vec![vec![0.5], vec![2.0], vec![2.0]];
        let dropdown = view(source);
        dropdown.reveal_answer();
        assert_eq!(
            dropdown.answer().get(),
            AnswerInput::Choices(vec![vec![false], vec![true], vec![false]])
        );
    }

    #[test]
    fn gap_fill_delegates_to_gaps() {
        let mut gap0 = FakePart::new("p0g0", PartKind::NumberEntry, 1.0);
        gap0.student_answer = "1".into();
        gap0.display_answer = "2".into();
        let mut gap1 = FakePart::new("p0g1", PartKind::PatternMatch, 3.0);
        gap1.display_answer = "x".into();
        let mut source = FakePart::new("p0", PartKind::GapFill, 4.0);
        source.gaps = vec![Rc::new(gap0), Rc::new(gap1)];
        source.marking = vec![MarkingAction::credit(1.0, "Gap 2 right.").for_gap(1)];
        let part = view(source);

        part.show();
        assert_eq!(part.gaps()[0].answer().get(), AnswerInput::Text("1".into()));
        part.reveal_answer();
        assert_eq!(part.gaps()[1].answer().get(), AnswerInput::Text("x".into()));
        assert!(part.find("p0g1").is_some());
        assert_eq!(
            part.feedback_messages().get(),
            vec!["Gap 2 right.\n\nYou were awarded 3 marks.".to_owned()]
        );
    }

    #[test]
    fn jme_preview_coalesces_keystrokes() {
        let mut source = FakePart::new("p0", PartKind::Jme, 1.0);
        source.student_answer = "x".into();
        let part = view(source);
        let preview = part.preview().unwrap();

        part.show();
        assert_eq!(part.flush_preview(&latex), PreviewFlush::Rendered("x".into()));
        assert_eq!(preview.tex().get(), "\\(x\\)");

        assert!(part.input("x+"));
        assert!(!part.input("x+1"));
        assert!(!part.input("x+12"));
        assert_eq!(part.flush_preview(&latex), PreviewFlush::Rendered("x+12".into()));
        assert_eq!(part.flush_preview(&latex), PreviewFlush::Idle);

        part.input("x+12");
        assert_eq!(part.flush_preview(&latex), PreviewFlush::Unchanged);
    }

    #[test]
    fn jme_preview_reports_errors_as_warnings() {
        let part = view(FakePart::new("p0", PartKind::Jme, 1.0));
        part.input("sin(x");
        let outcome = part.flush_preview(&latex);
        assert!(matches!(outcome, PreviewFlush::Invalid { .. }));
        assert!(!part.preview().unwrap().valid().get());
        assert_eq!(part.warnings().get(), vec!["unbalanced brackets in sin(x".to_owned()]);

        part.input("sin(x)");
        part.flush_preview(&latex);
        assert!(part.preview().unwrap().valid().get());
        assert!(part.warnings().get().is_empty());
    }

    #[test]
    fn non_expression_parts_have_no_preview() {
        let part = view(FakePart::new("p0", PartKind::NumberEntry, 1.0));
        assert!(part.preview().is_none());
        assert!(!part.input("3"));
        assert_eq!(part.flush_preview(&latex), PreviewFlush::Idle);
    }

    #[test]
    fn bind_keeps_computed_cells() {
        let mut part = view(FakePart::new("p0", PartKind::NumberEntry, 2.0));
        let feedback = part.score_feedback();
        part.bind(Rc::new(FakePart::new("p0", PartKind::NumberEntry, 5.0).scored(5.0)))
            .unwrap();
        assert_eq!(
            feedback.get(),
            ScoreFeedback::AnsweredTotalActual { score: 5.0, marks: 5.0 }
        );
    }

    #[test]
    fn disposed_part_rejects_refresh() {
        let mut part = view(FakePart::new("p3", PartKind::NumberEntry, 2.0));
        let feedback = part.score_feedback();
        part.dispose();
        assert!(part.is_disposed());
        assert!(feedback.is_disposed());
        assert_eq!(
            part.refresh(),
            Err(ViewError::Disposed {
                entity: "part p3".into()
            })
        );
        assert!(part.bind(Rc::new(FakePart::new("p3", PartKind::NumberEntry, 1.0))).is_err());
    }
}
