//! End-to-end flow: a host drives an exam through `ExamDisplay`, applying
//! each `DomainRequest` to its own model and refreshing the view.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Local};
use examview_core::carousel::{Carousel, CarouselConfig, ListMetrics, ManualAnimator};
use examview_runtime::view_state::{
    ExamMode, ExamSettings, ExamSource, InfoPage, PartKind, PartSource, QuestionSource,
    ScoreFeedback, ViewType,
};
use examview_runtime::{DomainRequest, ExamCommand, ExamDisplay, ExamView, StoredAnswer, ViewState};

// ── Domain model ──────────────────────────────────────────────────────────

struct Part {
    path: String,
    marks: f64,
    score: Cell<f64>,
    answered: Cell<bool>,
    answer: RefCell<String>,
}

impl PartSource for Part {
    fn path(&self) -> String {
        self.path.clone()
    }
    fn kind(&self) -> PartKind {
        PartKind::NumberEntry
    }
    fn score(&self) -> f64 {
        self.score.get()
    }
    fn marks(&self) -> f64 {
        self.marks
    }
    fn answered(&self) -> bool {
        self.answered.get()
    }
    fn student_answer(&self) -> String {
        self.answer.borrow().clone()
    }
    fn display_answer(&self) -> String {
        "7".into()
    }
}

struct Question {
    number: usize,
    visited: Cell<bool>,
    revealed: Cell<bool>,
    part: Rc<Part>,
}

impl QuestionSource for Question {
    fn number(&self) -> usize {
        self.number
    }
    fn name(&self) -> String {
        format!("Sum {}", self.number + 1)
    }
    fn score(&self) -> f64 {
        self.part.score.get()
    }
    fn marks(&self) -> f64 {
        self.part.marks
    }
    fn answered(&self) -> bool {
        self.part.answered.get()
    }
    fn visited(&self) -> bool {
        self.visited.get()
    }
    fn advice_displayed(&self) -> bool {
        false
    }
    fn revealed(&self) -> bool {
        self.revealed.get()
    }
    fn parts(&self) -> Vec<Rc<dyn PartSource>> {
        vec![Rc::clone(&self.part) as Rc<dyn PartSource>]
    }
}

struct Exam {
    settings: ExamSettings,
    current: Cell<Option<usize>>,
    questions: Vec<Rc<Question>>,
}

impl Exam {
    fn new(settings: ExamSettings) -> Rc<Self> {
        let questions = (0..settings.num_questions)
            .map(|number| {
                Rc::new(Question {
                    number,
                    visited: Cell::new(false),
                    revealed: Cell::new(false),
                    part: Rc::new(Part {
                        path: format!("q{number}p0"),
                        marks: 10.0 / settings.num_questions as f64,
                        score: Cell::new(0.0),
                        answered: Cell::new(false),
                        answer: RefCell::new(String::new()),
                    }),
                })
            })
            .collect();
        Rc::new(Self {
            settings,
            current: Cell::new(None),
            questions,
        })
    }

    fn part(&self, path: &str) -> &Part {
        self.questions
            .iter()
            .map(|q| &*q.part)
            .find(|p| p.path == path)
            .unwrap()
    }

    /// Apply a request the way the exam's business rules would.
    fn apply(&self, request: &DomainRequest) {
        match request {
            DomainRequest::JumpQuestion(n) => {
                self.current.set(Some(*n));
                self.questions[*n].visited.set(true);
            }
            DomainRequest::StoreAnswer {
                path,
                answer: StoredAnswer::Text(text),
            } => {
                *self.part(path).answer.borrow_mut() = text.clone();
            }
            DomainRequest::SubmitPart(path) => {
                let part = self.part(path);
                part.answered.set(true);
                let correct = part.answer.borrow().trim() == "7";
                part.score.set(if correct { part.marks } else { 0.0 });
            }
            DomainRequest::RevealAnswer => {
                if let Some(n) = self.current.get() {
                    self.questions[n].revealed.set(true);
                }
            }
            _ => {}
        }
    }
}

impl ExamSource for Exam {
    fn settings(&self) -> ExamSettings {
        self.settings.clone()
    }
    fn mode(&self) -> ExamMode {
        ExamMode::Normal
    }
    fn score(&self) -> f64 {
        self.questions.iter().map(|q| q.part.score.get()).sum()
    }
    fn marks(&self) -> f64 {
        10.0
    }
    fn percent_score(&self) -> f64 {
        self.score() * 10.0
    }
    fn time_remaining(&self) -> Option<f64> {
        None
    }
    fn time_spent(&self) -> f64 {
        0.0
    }
    fn current_question(&self) -> Option<usize> {
        self.current.get()
    }
    fn questions(&self) -> Vec<Rc<dyn QuestionSource>> {
        self.questions
            .iter()
            .map(|q| Rc::clone(q) as Rc<dyn QuestionSource>)
            .collect()
    }
    fn result(&self) -> String {
        String::new()
    }
    fn passed(&self) -> bool {
        false
    }
    fn feedback_message(&self) -> Option<String> {
        None
    }
    fn start_time(&self) -> Option<DateTime<Local>> {
        None
    }
    fn stop_time(&self) -> Option<DateTime<Local>> {
        None
    }
}

// ── Host ──────────────────────────────────────────────────────────────────

type Menu = Box<dyn Fn() -> ListMetrics>;

struct Host {
    exam: Rc<Exam>,
    display: ExamDisplay<Menu, ManualAnimator>,
    animator: ManualAnimator,
    menu_offset: Rc<Cell<f64>>,
}

impl Host {
    fn new(settings: ExamSettings) -> Self {
        let exam = Exam::new(settings);
        let count = exam.questions.len();
        let menu_offset = Rc::new(Cell::new(0.0));
        let offset = Rc::clone(&menu_offset);
        let measure: Menu =
            Box::new(move || ListMetrics::uniform(count, 40.0, 200.0).scrolled_to(offset.get()));
        let animator = ManualAnimator::new();
        let menu = Carousel::new(CarouselConfig::default(), measure, animator.clone());
        let display = ExamDisplay::new(ExamView::new(exam.clone()), menu);
        Self {
            exam,
            display,
            animator,
            menu_offset,
        }
    }

    fn send(&mut self, command: ExamCommand) -> Option<DomainRequest> {
        let request = self.display.dispatch(command).unwrap();
        if let Some(request) = &request {
            self.exam.apply(request);
            if matches!(request, DomainRequest::JumpQuestion(_)) {
                self.display.show_question().unwrap();
            }
            self.display.refresh().unwrap();
        }
        request
    }

    fn finish_menu_animations(&self) {
        while self.animator.in_flight_count() > 0 {
            if let Some(last) = self.animator.requests().last() {
                self.menu_offset.set(last.to);
            }
            self.animator.finish_next();
        }
    }
}

fn settings(count: usize) -> ExamSettings {
    ExamSettings::default()
        .with_name("Arithmetic")
        .with_num_questions(count)
}

// ── Scenarios ─────────────────────────────────────────────────────────────

#[test]
fn answering_updates_scores_everywhere() {
    let mut host = Host::new(settings(2));
    host.send(ExamCommand::SelectQuestion(0));
    assert_eq!(host.display.exam().view_type().get(), ViewType::Question);

    host.send(ExamCommand::PartInput {
        path: "q0p0".into(),
        text: "7".into(),
    });
    host.send(ExamCommand::SubmitPart("q0p0".into()));

    let exam = host.display.exam();
    assert_eq!(exam.exam_score_display().get(), "5/10");
    assert_eq!(exam.questions_attempted_display().get(), "1 / 2");
    let question = exam.current().unwrap();
    assert_eq!(
        question.score_feedback().get(),
        ScoreFeedback::AnsweredTotalActual {
            score: 5.0,
            marks: 5.0
        }
    );
}

#[test]
fn exam_score_hides_total_when_configured() {
    let host = Host::new(settings(10).with_show_total_mark(false));
    for q in &host.exam.questions[..7] {
        q.part.score.set(1.0);
    }
    host.display.refresh().unwrap();
    assert_eq!(host.display.exam().exam_score_display().get(), "7");

    let host = Host::new(settings(10));
    for q in &host.exam.questions[..7] {
        q.part.score.set(1.0);
    }
    host.display.refresh().unwrap();
    assert_eq!(host.display.exam().exam_score_display().get(), "7/10");
}

#[test]
fn reverse_navigation_disabled_by_policy() {
    let mut host = Host::new(settings(5).with_navigate_reverse(false));
    host.send(ExamCommand::SelectQuestion(3));
    assert_eq!(host.display.exam().current_question_number().get(), Some(3));
    assert!(!host.display.exam().can_reverse().get());
    assert_eq!(host.send(ExamCommand::PreviousQuestion), None);
    assert_eq!(
        host.send(ExamCommand::NextQuestion),
        Some(DomainRequest::JumpQuestion(4))
    );
    assert!(!host.display.exam().can_advance().get());
}

#[test]
fn question_menu_clamps_and_coalesces() {
    let mut host = Host::new(settings(20));
    host.send(ExamCommand::SelectQuestion(19));
    // Selecting scrolls once, showing the question asks again and is queued.
    assert_eq!(host.animator.request_count(), 1);
    assert_eq!(host.display.menu().in_flight(), Some(15));
    host.finish_menu_animations();
    assert_eq!(host.display.menu().current(), 15);

    host.send(ExamCommand::SelectQuestion(2));
    host.send(ExamCommand::SelectQuestion(8));
    host.send(ExamCommand::SelectQuestion(4));
    host.finish_menu_animations();
    assert_eq!(host.display.menu().current(), 4);
    assert_eq!(host.display.exam().current_question_number().get(), Some(4));
    // 19 -> 15 and 2, then the coalesced 4. The 8 never animated.
    let targets: Vec<f64> = host.animator.requests().iter().map(|r| r.to).collect();
    assert_eq!(targets, vec![600.0, 80.0, 160.0]);
}

#[test]
fn reveal_locks_the_part() {
    let mut host = Host::new(settings(1));
    host.send(ExamCommand::SelectQuestion(0));
    assert_eq!(host.send(ExamCommand::RevealAnswer), Some(DomainRequest::RevealAnswer));
    host.display.exam().current().unwrap().reveal_answer();

    let part = host.display.exam().current().unwrap().part("q0p0").unwrap();
    assert!(part.input_disabled().get());
    assert_eq!(host.send(ExamCommand::RevealAnswer), None);
    assert_eq!(
        host.send(ExamCommand::PartInput {
            path: "q0p0".into(),
            text: "3".into()
        }),
        None
    );
}

#[test]
fn info_pages_clear_the_current_question() {
    let mut host = Host::new(settings(3));
    host.send(ExamCommand::SelectQuestion(1));
    host.display.show_info_page(InfoPage::Suspend);
    let exam = host.display.exam();
    assert_eq!(exam.view_type().get(), ViewType::InfoPage);
    assert_eq!(exam.current_question_number().get(), None);
    assert!(!exam.can_reverse().get());
    assert!(!exam.can_advance().get());
}

#[test]
fn dispose_surfaces_dangling_use() {
    let host = Host::new(settings(2));
    let mut view = ExamView::new(host.exam.clone());
    view.dispose();
    assert!(view.refresh().is_err());
}
