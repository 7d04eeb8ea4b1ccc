use std::fmt;

use quiz_core::model::{
    AnswerId, AnswerOption, AttemptContext, AttemptId, AttemptLedger, Lesson, LessonId,
    QuestionRef, StudentId, Subject, SubjectId, SubmissionRecord, Topic, TopicId,
};
use quiz_core::{Clock, Countdown, ScoringPolicy, TickOutcome};
use remote::RemoteError;

use crate::answer_cache::AnswerCache;
use crate::catalog_loader::{
    CatalogLoader, CatalogRequest, CatalogResponse, LoadOutcome, Selection,
};
use super::events::{Direction, SessionEffect, SessionEvent};
use super::progress::SessionProgress;

/// Where an attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Configuring,
    InProgress,
    Submitting,
    Terminated,
}

/// Per-attempt configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub student_id: StudentId,
    pub exam_duration_seconds: u32,
    pub question_count: u32,
    pub scoring: ScoringPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            student_id: StudentId::new(2),
            exam_duration_seconds: 5 * 60,
            question_count: quiz_core::model::DEFAULT_QUESTION_COUNT,
            scoring: ScoringPolicy::default(),
        }
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// State owned by one pass through a loaded question sequence.
#[derive(Debug, Clone)]
struct Attempt {
    context: AttemptContext,
    sequence: Vec<QuestionRef>,
    current: usize,
    ledger: AttemptLedger,
    countdown: Countdown,
    highlighted: Option<AnswerId>,
    record: Option<SubmissionRecord>,
    submit_in_flight: bool,
}

impl Attempt {
    fn current_question(&self) -> Option<&QuestionRef> {
        self.sequence.get(self.current)
    }

    fn is_last(&self) -> bool {
        self.current + 1 == self.sequence.len()
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Quiz attempt state machine.
///
/// Every change arrives as a `SessionEvent`; the returned `SessionEffect`s describe the
/// fetches, timer changes, and submissions the host must perform. Events that make no
/// sense in the current phase are ignored and produce no effects.
pub struct QuizSession {
    settings: SessionSettings,
    clock: Clock,
    phase: SessionPhase,
    catalog: CatalogLoader,
    answers: AnswerCache,
    attempt: Option<Attempt>,
    attempt_id: Option<AttemptId>,
    last_failure: Option<String>,
    closed: bool,
}

impl QuizSession {
    #[must_use]
    pub fn new(settings: SessionSettings, clock: Clock) -> Self {
        Self {
            settings,
            clock,
            phase: SessionPhase::Configuring,
            catalog: CatalogLoader::new(settings.question_count),
            answers: AnswerCache::new(),
            attempt: None,
            attempt_id: None,
            last_failure: None,
            closed: false,
        }
    }

    /// Effects needed to populate the first selection level.
    pub fn start(&mut self) -> Vec<SessionEffect> {
        if self.closed {
            return Vec::new();
        }
        vec![SessionEffect::Fetch(self.catalog.request_subjects())]
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        if self.closed {
            return Vec::new();
        }
        match event {
            SessionEvent::SubjectSelected(id) => self.select_subject(id),
            SessionEvent::TopicSelected(id) => self.select_topic(id),
            SessionEvent::LessonSelected(id) => self.select_lesson(id),
            SessionEvent::QuestionCountChanged(count) => self.set_question_count(count),
            SessionEvent::SelectionBack => self.step_back(),
            SessionEvent::Loaded(response) => self.apply(response),
            SessionEvent::AnswerSelected(id) => self.select_answer(id),
            SessionEvent::Navigate(direction) => self.navigate(direction),
            SessionEvent::Tick => self.tick(),
            SessionEvent::SubmitRequested => self.request_submit(),
            SessionEvent::RetrySubmission => self.retry_submission(),
            SessionEvent::SubmissionSucceeded(id) => self.submission_succeeded(id),
            SessionEvent::SubmissionFailed(err) => self.submission_failed(&err),
            SessionEvent::Abandoned => self.abandon(),
        }
    }

    //
    // ─── SELECTION ─────────────────────────────────────────────────────────────
    //

    fn accepts_selection_changes(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Configuring | SessionPhase::InProgress
        )
    }

    pub fn select_subject(&mut self, subject: SubjectId) -> Vec<SessionEffect> {
        if !self.accepts_selection_changes() {
            return Vec::new();
        }
        let mut effects = self.reset_attempt();
        effects.push(SessionEffect::Fetch(self.catalog.select_subject(subject)));
        effects
    }

    pub fn select_topic(&mut self, topic: TopicId) -> Vec<SessionEffect> {
        if !self.accepts_selection_changes() || self.catalog.selection().subject.is_none() {
            return Vec::new();
        }
        let mut effects = self.reset_attempt();
        effects.extend(self.catalog.select_topic(topic).map(SessionEffect::Fetch));
        effects
    }

    pub fn select_lesson(&mut self, lesson: LessonId) -> Vec<SessionEffect> {
        if !self.accepts_selection_changes() || self.catalog.selection().topic.is_none() {
            return Vec::new();
        }
        let mut effects = self.reset_attempt();
        effects.extend(self.catalog.select_lesson(lesson).map(SessionEffect::Fetch));
        effects
    }

    pub fn set_question_count(&mut self, count: u32) -> Vec<SessionEffect> {
        if !self.accepts_selection_changes() || count == 0 {
            return Vec::new();
        }
        let mut effects = self.reset_attempt();
        effects.extend(self.catalog.set_count(count).map(SessionEffect::Fetch));
        effects
    }

    /// Reopen the level above the deepest choice, e.g. after a lesson turned out empty.
    pub fn step_back(&mut self) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Configuring {
            return Vec::new();
        }
        self.catalog
            .step_back()
            .map(SessionEffect::Fetch)
            .into_iter()
            .collect()
    }

    /// Drop the attempt in progress and return to `Configuring`.
    fn reset_attempt(&mut self) -> Vec<SessionEffect> {
        self.answers.clear();
        let Some(attempt) = self.attempt.take() else {
            return Vec::new();
        };
        tracing::info!(
            answered = attempt.ledger.len(),
            "selection changed, discarding attempt in progress"
        );
        self.phase = SessionPhase::Configuring;
        vec![SessionEffect::StopTimer]
    }

    //
    // ─── LOADS ─────────────────────────────────────────────────────────────────
    //

    fn apply(&mut self, response: CatalogResponse) -> Vec<SessionEffect> {
        match response {
            CatalogResponse::Subjects { ticket, result } => {
                self.catalog.apply_subjects(ticket, result);
                Vec::new()
            }
            CatalogResponse::Topics { ticket, result } => {
                self.catalog.apply_topics(ticket, result);
                Vec::new()
            }
            CatalogResponse::Lessons { ticket, result } => {
                self.catalog.apply_lessons(ticket, result);
                Vec::new()
            }
            CatalogResponse::Questions { ticket, result } => {
                if self.catalog.apply_questions(ticket, result) == LoadOutcome::Applied {
                    self.begin_attempt()
                } else {
                    Vec::new()
                }
            }
            CatalogResponse::Answers {
                ticket,
                question,
                result,
            } => {
                if self.phase == SessionPhase::InProgress {
                    self.answers.apply(ticket, question, result);
                }
                Vec::new()
            }
        }
    }

    fn begin_attempt(&mut self) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Configuring {
            return Vec::new();
        }
        let Some(query) = self.catalog.selection().query() else {
            return Vec::new();
        };
        let sequence = self.catalog.questions().to_vec();
        let Some(first) = sequence.first().map(|q| q.question_id) else {
            tracing::info!(lesson = %query.lesson, "lesson has no questions");
            return Vec::new();
        };

        let context = AttemptContext {
            subject_id: query.subject,
            topic_id: query.topic,
            student_id: self.settings.student_id,
            exam_duration_seconds: self.settings.exam_duration_seconds,
            total_questions: u32::try_from(sequence.len()).unwrap_or(u32::MAX),
        };
        let mut countdown = Countdown::new(self.settings.exam_duration_seconds);
        countdown.start();

        self.attempt = Some(Attempt {
            context,
            ledger: AttemptLedger::new(sequence.iter().map(|q| q.question_id)),
            sequence,
            current: 0,
            countdown,
            highlighted: None,
            record: None,
            submit_in_flight: false,
        });
        self.attempt_id = None;
        self.last_failure = None;
        self.phase = SessionPhase::InProgress;
        tracing::info!(
            questions = context.total_questions,
            seconds = context.exam_duration_seconds,
            "attempt started"
        );

        vec![
            SessionEffect::StartTimer,
            SessionEffect::Fetch(self.answers.load_for(first)),
        ]
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Record a choice for the question on screen. Does not move to the next question.
    pub fn select_answer(&mut self, answer: AnswerId) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::InProgress {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        let Some(question) = attempt.current_question().map(|q| q.question_id) else {
            return Vec::new();
        };
        if self.answers.question() != Some(question) {
            return Vec::new();
        }
        let Some(option) = self.answers.option(answer) else {
            return Vec::new();
        };

        match attempt
            .ledger
            .record_selection(question, answer, option.is_correct)
        {
            Ok(_) => attempt.highlighted = Some(answer),
            Err(err) => tracing::warn!(error = %err, "selection not recorded"),
        }
        Vec::new()
    }

    pub fn navigate(&mut self, direction: Direction) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::InProgress {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        let last = attempt.sequence.len().saturating_sub(1);
        let target = match direction {
            Direction::Next => (attempt.current + 1).min(last),
            Direction::Previous => attempt.current.saturating_sub(1),
        };
        if target == attempt.current {
            return Vec::new();
        }

        attempt.current = target;
        attempt.highlighted = None;
        let question = attempt.sequence[target].question_id;
        vec![SessionEffect::Fetch(self.answers.load_for(question))]
    }

    //
    // ─── TIMER ─────────────────────────────────────────────────────────────────
    //

    pub fn tick(&mut self) -> Vec<SessionEffect> {
        let phase = self.phase;
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        let outcome = attempt.countdown.tick();
        if outcome == TickOutcome::Ignored {
            return Vec::new();
        }
        if phase == SessionPhase::InProgress {
            if let Some(question) = attempt.current_question().map(|q| q.question_id) {
                attempt.ledger.note_dwell(question, 1);
            }
        }
        if outcome != TickOutcome::Expired {
            return Vec::new();
        }

        let mut effects = vec![SessionEffect::StopTimer];
        if phase == SessionPhase::InProgress {
            tracing::info!("time is up, submitting attempt");
            effects.extend(self.begin_submission());
        }
        effects
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Submit from the final question.
    pub fn request_submit(&mut self) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::InProgress {
            return Vec::new();
        }
        match self.attempt.as_ref() {
            Some(attempt) if attempt.is_last() => self.begin_submission(),
            _ => Vec::new(),
        }
    }

    fn begin_submission(&mut self) -> Vec<SessionEffect> {
        let now = self.clock.now();
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        if attempt.record.is_some() {
            return Vec::new();
        }

        let record = SubmissionRecord::reduce(
            attempt.context,
            &attempt.ledger,
            &self.settings.scoring,
            attempt.countdown.remaining(),
            now,
        );
        attempt.record = Some(record.clone());
        attempt.submit_in_flight = true;
        self.phase = SessionPhase::Submitting;
        tracing::info!(
            attempted = record.tally.attempted,
            correct = record.tally.correct,
            score = record.score,
            passed = record.passed,
            "submitting attempt"
        );
        vec![SessionEffect::Submit(record)]
    }

    /// Re-send the frozen record after a failed submission.
    pub fn retry_submission(&mut self) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Submitting {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        if attempt.submit_in_flight {
            return Vec::new();
        }
        let Some(record) = attempt.record.clone() else {
            return Vec::new();
        };
        attempt.submit_in_flight = true;
        self.last_failure = None;
        vec![SessionEffect::Submit(record)]
    }

    fn submission_succeeded(&mut self, id: AttemptId) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Submitting {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        attempt.submit_in_flight = false;
        attempt.countdown.stop();
        self.attempt_id = Some(id);
        self.last_failure = None;
        self.phase = SessionPhase::Terminated;
        self.answers.clear();
        tracing::info!(attempt_id = %id, "attempt submitted");
        vec![SessionEffect::StopTimer]
    }

    fn submission_failed(&mut self, err: &RemoteError) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Submitting {
            return Vec::new();
        }
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.submit_in_flight = false;
        }
        tracing::error!(error = %err, "attempt submission failed");
        self.last_failure = Some(err.to_string());
        Vec::new()
    }

    /// Leave the session: stop the clock and ignore anything still in flight.
    fn abandon(&mut self) -> Vec<SessionEffect> {
        self.closed = true;
        self.catalog.cancel_pending();
        self.answers.clear();
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.countdown.stop();
        }
        tracing::info!(phase = ?self.phase, "session abandoned");
        vec![SessionEffect::StopTimer]
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.catalog.selection()
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogLoader {
        &self.catalog
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        self.catalog.subjects()
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        self.catalog.topics()
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        self.catalog.lessons()
    }

    /// The attempt's question sequence; empty while configuring.
    #[must_use]
    pub fn sequence(&self) -> &[QuestionRef] {
        match &self.attempt {
            Some(attempt) => &attempt.sequence,
            None => &[],
        }
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.attempt.as_ref().map(|attempt| attempt.current)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionRef> {
        match self.phase {
            SessionPhase::InProgress => self.attempt.as_ref()?.current_question(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.attempt.as_ref().is_some_and(Attempt::is_last)
    }

    /// Options of the question on screen.
    #[must_use]
    pub fn answer_options(&self) -> &[AnswerOption] {
        self.answers.options()
    }

    #[must_use]
    pub fn answers_loading(&self) -> bool {
        self.answers.is_loading()
    }

    /// The option highlighted for the question on screen, if chosen since arriving.
    #[must_use]
    pub fn highlighted(&self) -> Option<AnswerId> {
        self.attempt.as_ref()?.highlighted
    }

    #[must_use]
    pub fn ledger(&self) -> Option<&AttemptLedger> {
        self.attempt.as_ref().map(|attempt| &attempt.ledger)
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.attempt
            .as_ref()
            .map(|attempt| attempt.countdown.remaining())
    }

    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(|attempt| attempt.countdown.is_running())
    }

    /// The record computed at the terminal transition.
    #[must_use]
    pub fn submission(&self) -> Option<&SubmissionRecord> {
        self.attempt.as_ref()?.record.as_ref()
    }

    #[must_use]
    pub fn submission_in_flight(&self) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(|attempt| attempt.submit_in_flight)
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt_id
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Progress so far; `None` until an attempt has started.
    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        let attempt = self.attempt.as_ref()?;
        Some(SessionProgress {
            total: attempt.sequence.len(),
            answered: attempt.ledger.len(),
            remaining_unanswered: attempt.sequence.len().saturating_sub(attempt.ledger.len()),
            current_position: attempt.current + 1,
            remaining_seconds: attempt.countdown.remaining(),
            low_time: attempt.countdown.is_low(),
        })
    }

    /// Re-issue the fetch for the current level, for retrying after a failed load.
    pub fn reload(&mut self) -> Vec<SessionEffect> {
        if self.closed {
            return Vec::new();
        }
        let request: Option<CatalogRequest> = match self.phase {
            SessionPhase::InProgress => self
                .attempt
                .as_ref()
                .and_then(Attempt::current_question)
                .map(|q| q.question_id)
                .map(|question| self.answers.load_for(question)),
            SessionPhase::Configuring => {
                let selection = self.catalog.selection();
                match (selection.subject, selection.topic, selection.lesson) {
                    (None, _, _) => Some(self.catalog.request_subjects()),
                    (Some(subject), None, _) => Some(self.catalog.select_subject(subject)),
                    (Some(_), Some(topic), None) => self.catalog.select_topic(topic),
                    (Some(_), Some(_), Some(lesson)) => self.catalog.select_lesson(lesson),
                }
            }
            SessionPhase::Submitting | SessionPhase::Terminated => None,
        };
        request.map(SessionEffect::Fetch).into_iter().collect()
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("phase", &self.phase)
            .field("selection", &self.catalog.selection())
            .field("sequence_len", &self.sequence().len())
            .field("current", &self.current_index())
            .field("answered", &self.ledger().map(AttemptLedger::len))
            .field("remaining_seconds", &self.remaining_seconds())
            .field("attempt_id", &self.attempt_id)
            .finish_non_exhaustive()
    }
}
