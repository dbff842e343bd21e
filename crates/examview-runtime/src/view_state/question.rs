#![forbid(unsafe_code)]

//! View state for one question and its parts.

use std::fmt;
use std::rc::Rc;

use super::feedback::{AnswerState, FeedbackPolicy, ScoreFeedback};
use super::part::PartView;
use super::source::{ExamSettings, PartSource, QuestionSource};
use super::{Result, ViewState, ensure_live};
use crate::reactive::{Computed, Node, Observable, ReadOnly};

/// View state for one question.
pub struct QuestionView {
    source: Rc<dyn QuestionSource>,
    disposed: bool,

    policy: Observable<FeedbackPolicy>,
    allow_reveal_answer: Observable<bool>,
    navigate_browse: Observable<bool>,

    number: Observable<usize>,
    name: Observable<String>,
    score: Observable<f64>,
    marks: Observable<f64>,
    answered: Observable<bool>,
    visited: Observable<bool>,
    advice_displayed: Observable<bool>,
    revealed: Observable<bool>,
    part_count: Observable<usize>,
    any_part_answered: Observable<bool>,

    display_name: Computed<String>,
    score_feedback: Computed<ScoreFeedback>,
    answer_state: Computed<Option<AnswerState>>,
    submit_label: Computed<String>,
    can_reveal: Computed<bool>,
    menu_visible: Computed<bool>,

    parts: Vec<PartView>,
}

impl fmt::Debug for QuestionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionView")
            .field("number", &self.number.get())
            .field("name", &self.name.get())
            .field("score", &self.score.get())
            .field("marks", &self.marks.get())
            .field("parts", &self.parts)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

fn build_parts(
    sources: Vec<Rc<dyn PartSource>>,
    policy: FeedbackPolicy,
    revealed: bool,
) -> Vec<PartView> {
    let sole = sources.len() == 1;
    sources
        .into_iter()
        .map(|source| PartView::new(source, policy, revealed, sole))
        .collect()
}

impl QuestionView {
    pub fn new(source: Rc<dyn QuestionSource>, settings: &ExamSettings) -> Self {
        let policy = Observable::new(FeedbackPolicy::from(settings));
        let allow_reveal_answer = Observable::new(settings.allow_reveal_answer);
        let navigate_browse = Observable::new(settings.navigate_browse);

        let number = Observable::new(source.number());
        let name = Observable::new(source.name());
        let score = Observable::new(source.score());
        let marks = Observable::new(source.marks());
        let answered = Observable::new(source.answered());
        let visited = Observable::new(source.visited());
        let advice_displayed = Observable::new(source.advice_displayed());
        let revealed = Observable::new(source.revealed());

        let parts = build_parts(source.parts(), policy.get(), revealed.get());
        let part_count = Observable::new(parts.len());
        let any_part_answered = Observable::new(parts.iter().any(|p| p.answered().get()));

        let display_name = Computed::from2(&number, &name, |number: &usize, name: &String| {
            format!("{}. {}", number + 1, name)
        });

        let score_feedback = {
            let deps: [&dyn Node; 4] = [&policy, &answered, &score, &marks];
            let (policy, answered, score, marks) =
                (policy.clone(), answered.clone(), score.clone(), marks.clone());
            Computed::from_fn(&deps, move || {
                ScoreFeedback::for_score(answered.get(), score.get(), marks.get(), policy.get())
            })
        };

        let answer_state = {
            let deps: [&dyn Node; 4] = [&policy, &answered, &score, &marks];
            let (policy, answered, score, marks) =
                (policy.clone(), answered.clone(), score.clone(), marks.clone());
            Computed::from_fn(&deps, move || {
                AnswerState::for_score(answered.get(), score.get(), marks.get(), policy.get())
            })
        };

        let submit_label = {
            let deps: [&dyn Node; 3] = [&policy, &answered, &part_count];
            let (policy, answered, part_count) =
                (policy.clone(), answered.clone(), part_count.clone());
            Computed::from_fn(&deps, move || {
                let policy = policy.get();
                let label = if !policy.show_total_mark && !policy.show_actual_mark {
                    if answered.get() { "Submit again" } else { "Submit" }
                } else if part_count.get() <= 1 {
                    "Submit answer"
                } else {
                    "Submit all parts"
                };
                label.to_owned()
            })
        };

        let can_reveal = Computed::from2(
            &allow_reveal_answer,
            &revealed,
            |allowed: &bool, revealed: &bool| *allowed && !*revealed,
        );

        let menu_visible = Computed::from2(
            &visited,
            &navigate_browse,
            |visited: &bool, browse: &bool| *visited || *browse,
        );

        Self {
            source,
            disposed: false,
            policy,
            allow_reveal_answer,
            navigate_browse,
            number,
            name,
            score,
            marks,
            answered,
            visited,
            advice_displayed,
            revealed,
            part_count,
            any_part_answered,
            display_name,
            score_feedback,
            answer_state,
            submit_label,
            can_reveal,
            menu_visible,
            parts,
        }
    }

    /// Zero-based position in the exam.
    #[must_use]
    pub fn number(&self) -> ReadOnly<usize> {
        self.number.read_only()
    }

    #[must_use]
    pub fn name(&self) -> ReadOnly<String> {
        self.name.read_only()
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
    pub fn visited(&self) -> ReadOnly<bool> {
        self.visited.read_only()
    }

    #[must_use]
    pub fn advice_displayed(&self) -> ReadOnly<bool> {
        self.advice_displayed.read_only()
    }

    #[must_use]
    pub fn revealed(&self) -> ReadOnly<bool> {
        self.revealed.read_only()
    }

    /// Whether any part has been answered; the question-level score box is
    /// hidden until one has.
    #[must_use]
    pub fn any_part_answered(&self) -> ReadOnly<bool> {
        self.any_part_answered.read_only()
    }

    /// `"3. Name"`, numbered from one.
    #[must_use]
    pub fn display_name(&self) -> Computed<String> {
        self.display_name.clone()
    }

    #[must_use]
    pub fn score_feedback(&self) -> Computed<ScoreFeedback> {
        self.score_feedback.clone()
    }

    #[must_use]
    pub fn answer_state(&self) -> Computed<Option<AnswerState>> {
        self.answer_state.clone()
    }

    #[must_use]
    pub fn submit_label(&self) -> Computed<String> {
        self.submit_label.clone()
    }

    /// Whether the reveal button is offered.
    #[must_use]
    pub fn can_reveal(&self) -> Computed<bool> {
        self.can_reveal.clone()
    }

    /// Whether the question is listed in the question menu.
    #[must_use]
    pub fn menu_visible(&self) -> Computed<bool> {
        self.menu_visible.clone()
    }

    #[must_use]
    pub fn parts(&self) -> &[PartView] {
        &self.parts
    }

    /// The part, gap or step with the given path.
    #[must_use]
    pub fn part(&self, path: &str) -> Option<&PartView> {
        self.parts.iter().find_map(|part| part.find(path))
    }

    /// Show every part, revealing answers if the question was revealed.
    pub fn show(&self) {
        for part in &self.parts {
            part.show();
        }
    }

    /// Fill in correct answers once the question is revealed. Does nothing
    /// before then.
    pub fn reveal_answer(&self) {
        if !self.revealed.get() {
            return;
        }
        for part in &self.parts {
            part.reveal_answer();
        }
    }

    /// Final refresh when the exam ends.
    ///
    /// # Errors
    ///
    /// [`ViewError::Disposed`](super::ViewError::Disposed) after dispose.
    pub fn end(&self) -> Result<()> {
        self.refresh()?;
        self.reveal_answer();
        Ok(())
    }

    pub(crate) fn apply_settings(&self, settings: &ExamSettings) {
        let policy = FeedbackPolicy::from(settings);
        self.policy.set(policy);
        self.allow_reveal_answer.set(settings.allow_reveal_answer);
        self.navigate_browse.set(settings.navigate_browse);
        for part in &self.parts {
            part.set_policy(policy);
        }
    }

    fn entity(&self) -> String {
        format!("question {}", self.number.get() + 1)
    }
}

impl ViewState for QuestionView {
    type Source = dyn QuestionSource;

    fn refresh(&self) -> Result<()> {
        ensure_live(self.disposed, || self.entity())?;
        let source = &self.source;
        let revealed = source.revealed();
        for part in &self.parts {
            part.set_revealed(revealed);
            part.refresh()?;
        }
        self.number.set(source.number());
        self.name.set(source.name());
        self.score.set(source.score());
        self.marks.set(source.marks());
        self.answered.set(source.answered());
        self.visited.set(source.visited());
        self.advice_displayed.set(source.advice_displayed());
        self.revealed.set(revealed);
        self.part_count.set(self.parts.len());
        self.any_part_answered
            .set(self.parts.iter().any(|p| p.answered().get()));
        Ok(())
    }

    fn bind(&mut self, source: Rc<dyn QuestionSource>) -> Result<()> {
        ensure_live(self.disposed, || self.entity())?;
        let sources = source.parts();
        if sources.len() == self.parts.len() {
            for (part, part_source) in self.parts.iter_mut().zip(sources) {
                part.bind(part_source)?;
            }
        } else {
            for part in &mut self.parts {
                part.dispose();
            }
            self.parts = build_parts(sources, self.policy.get(), source.revealed());
        }
        self.source = source;
        self.refresh()
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for part in &mut self.parts {
            part.dispose();
        }
        self.display_name.dispose();
        self.score_feedback.dispose();
        self.answer_state.dispose();
        self.submit_label.dispose();
        self.can_reveal.dispose();
        self.menu_visible.dispose();
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
    use crate::view_state::part::tests::FakePart;
    use crate::view_state::source::PartKind;

    /// In-memory question for tests; fields may change between refreshes.
    #[derive(Debug, Clone)]
    pub(crate) struct FakeQuestion {
        pub number: usize,
        pub name: String,
        pub score: f64,
        pub marks: f64,
        pub answered: bool,
        pub visited: bool,
        pub advice_displayed: bool,
        pub revealed: bool,
        pub parts: Vec<Rc<FakePart>>,
    }

    impl FakeQuestion {
        pub(crate) fn new(number: usize, name: &str, marks: f64) -> Self {
            Self {
                number,
                name: name.into(),
                score: 0.0,
                marks,
                answered: false,
                visited: false,
                advice_displayed: false,
                revealed: false,
                parts: vec![Rc::new(FakePart::new(
                    &format!("q{number}p0"),
                    PartKind::NumberEntry,
                    marks,
                ))],
            }
        }
    }

    /// Shared, mutable question source.
    #[derive(Debug)]
    pub(crate) struct SharedQuestion(pub RefCell<FakeQuestion>);

    impl SharedQuestion {
        pub(crate) fn new(question: FakeQuestion) -> Rc<Self> {
            Rc::new(Self(RefCell::new(question)))
        }
    }

    impl QuestionSource for SharedQuestion {
        fn number(&self) -> usize {
            self.0.borrow().number
        }
        fn name(&self) -> String {
            self.0.borrow().name.clone()
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
        fn visited(&self) -> bool {
            self.0.borrow().visited
        }
        fn advice_displayed(&self) -> bool {
            self.0.borrow().advice_displayed
        }
        fn revealed(&self) -> bool {
            self.0.borrow().revealed
        }
        fn parts(&self) -> Vec<Rc<dyn PartSource>> {
            self.0
                .borrow()
                .parts
                .iter()
                .map(|p| Rc::clone(p) as Rc<dyn PartSource>)
                .collect()
        }
    }

    #[test]
    fn display_name_is_one_based() {
        let question = QuestionView::new(
            SharedQuestion::new(FakeQuestion::new(2, "Integration", 3.0)),
            &ExamSettings::default(),
        );
        assert_eq!(question.display_name().get(), "3. Integration");
    }

    #[test]
    fn score_feedback_tracks_refresh() {
        let source = SharedQuestion::new(FakeQuestion::new(0, "Limits", 10.0));
        let question = QuestionView::new(source.clone(), &ExamSettings::default());
        assert_eq!(question.score_feedback().get(), ScoreFeedback::Unanswered { marks: 10.0 });

        {
            let mut q = source.0.borrow_mut();
            q.score = 7.0;
            q.answered = true;
        }
        question.refresh().unwrap();
        assert_eq!(
            question.score_feedback().get(),
            ScoreFeedback::AnsweredTotalActual { score: 7.0, marks: 10.0 }
        );
        assert_eq!(question.answer_state().get(), Some(AnswerState::Partial));
    }

    #[test]
    fn submit_label_variants() {
        let mut multi = FakeQuestion::new(0, "Multi", 2.0);
        multi.parts.push(Rc::new(FakePart::new("q0p1", PartKind::Jme, 1.0)));
        let question = QuestionView::new(SharedQuestion::new(multi), &ExamSettings::default());
        assert_eq!(question.submit_label().get(), "Submit all parts");

        let single = SharedQuestion::new(FakeQuestion::new(1, "Single", 2.0));
        let question = QuestionView::new(single.clone(), &ExamSettings::default());
        assert_eq!(question.submit_label().get(), "Submit answer");

        let hidden = ExamSettings::default()
            .with_show_total_mark(false)
            .with_show_actual_mark(false);
        let question = QuestionView::new(single.clone(), &hidden);
        assert_eq!(question.submit_label().get(), "Submit");
        single.0.borrow_mut().answered = true;
        question.refresh().unwrap();
        assert_eq!(question.submit_label().get(), "Submit again");
    }

    #[test]
    fn settings_change_reaches_parts() {
        let question = QuestionView::new(
            SharedQuestion::new(FakeQuestion::new(0, "Q", 2.0)),
            &ExamSettings::default(),
        );
        let part_feedback = question.parts()[0].score_feedback();
        assert_eq!(part_feedback.get(), ScoreFeedback::Unanswered { marks: 2.0 });
        question.apply_settings(&ExamSettings::default().with_show_total_mark(false));
        assert_eq!(part_feedback.get(), ScoreFeedback::Hidden);
    }

    #[test]
    fn reveal_answer_requires_revealed() {
        let mut fake = FakeQuestion::new(0, "Q", 1.0);
        let mut part = FakePart::new("q0p0", PartKind::NumberEntry, 1.0);
        part.display_answer = "42".into();
        fake.parts = vec![Rc::new(part)];
        let source = SharedQuestion::new(fake);
        let question = QuestionView::new(source.clone(), &ExamSettings::default());

        question.reveal_answer();
        assert!(!question.parts()[0].input_disabled().get());

        source.0.borrow_mut().revealed = true;
        question.refresh().unwrap();
        assert!(!question.can_reveal().get());
        question.reveal_answer();
        let part = question.part("q0p0").unwrap();
        assert!(part.input_disabled().get());
        assert_eq!(
            part.answer().get(),
            crate::view_state::AnswerInput::Text("42".into())
        );
    }

    #[test]
    fn bind_rebuilds_parts_when_shape_changes() {
        let mut question = QuestionView::new(
            SharedQuestion::new(FakeQuestion::new(0, "Q", 1.0)),
            &ExamSettings::default(),
        );
        let display_name = question.display_name();
        let mut regenerated = FakeQuestion::new(0, "Q (again)", 2.0);
        regenerated
            .parts
            .push(Rc::new(FakePart::new("q0p1", PartKind::NumberEntry, 1.0)));
        question.bind(SharedQuestion::new(regenerated)).unwrap();
        assert_eq!(question.parts().len(), 2);
        assert_eq!(display_name.get(), "1. Q (again)");
        assert_eq!(question.submit_label().get(), "Submit all parts");
    }

    #[test]
    fn dispose_blocks_refresh() {
        let mut question = QuestionView::new(
            SharedQuestion::new(FakeQuestion::new(4, "Q", 1.0)),
            &ExamSettings::default(),
        );
        question.dispose();
        assert!(question.display_name().is_disposed());
        assert_eq!(
            question.refresh(),
            Err(ViewError::Disposed {
                entity: "question 5".into()
            })
        );
    }
}
