use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::model::{
    AnswerId, AnswerOption, AttemptId, Lesson, LessonId, QuestionId, QuestionRef, Subject,
    SubjectId, SubmissionRecord, Topic, TopicId,
};
use quiz_core::time::fixed_now;
use remote::{AttemptRepository, Backend, CatalogLevel, InMemoryBackend, RemoteError};
use services::{
    AttemptRunner, Clock, Direction, QuizSession, SessionError, SessionEvent, SessionPhase,
    SessionSettings,
};

const SUBJECT: SubjectId = SubjectId::new(1);
const TOPIC: TopicId = TopicId::new(2);
const LESSON: LessonId = LessonId::new(3);

/// Submission sink that also hands out certificate links.
struct CertifyingAttempts(InMemoryBackend);

#[async_trait]
impl AttemptRepository for CertifyingAttempts {
    async fn submit_attempt(&self, record: &SubmissionRecord) -> Result<AttemptId, RemoteError> {
        self.0.submit_attempt(record).await
    }

    fn certificate_url(&self, attempt: AttemptId) -> Option<String> {
        Some(format!("memory://certificates/{attempt}"))
    }
}

fn correct_answer(question: QuestionId) -> AnswerId {
    AnswerId::new(question.value() * 10)
}

fn wrong_answer(question: QuestionId) -> AnswerId {
    AnswerId::new(question.value() * 10 + 1)
}

fn seeded(questions: u64) -> InMemoryBackend {
    let repo = InMemoryBackend::new();
    repo.add_subject(Subject::new(SUBJECT, "Mathematics"));
    repo.add_topic(SUBJECT, Topic::new(TOPIC, "Algebra"));
    repo.add_lesson(TOPIC, Lesson::new(LESSON, "Linear equations"));
    for id in 1..=questions {
        let question = QuestionId::new(id);
        repo.add_question(
            SUBJECT,
            TOPIC,
            LESSON,
            QuestionRef::new(question, format!("Question {id}")),
        );
        repo.set_answers(
            question,
            vec![
                AnswerOption::new(correct_answer(question), "right", true),
                AnswerOption::new(wrong_answer(question), "wrong", false),
            ],
        );
    }
    repo
}

fn runner(repo: &InMemoryBackend, exam_duration_seconds: u32) -> AttemptRunner {
    let backend = Backend {
        catalog: Arc::new(repo.clone()),
        attempts: Arc::new(CertifyingAttempts(repo.clone())),
    };
    let settings = SessionSettings {
        exam_duration_seconds,
        ..SessionSettings::default()
    };
    AttemptRunner::new(QuizSession::new(settings, Clock::fixed(fixed_now())), backend)
}

fn answers_shown(session: &QuizSession) -> bool {
    let Some(question) = session.current_question() else {
        return false;
    };
    session
        .answer_options()
        .first()
        .is_some_and(|option| option.answer_id == correct_answer(question.question_id))
}

/// Walk the hierarchy down to the lesson; the questions request is left in flight.
async fn open_lesson(runner: &mut AttemptRunner) {
    runner.start();
    runner.run_until(|s| !s.subjects().is_empty()).await;
    runner.dispatch(SessionEvent::SubjectSelected(SUBJECT));
    runner.run_until(|s| !s.topics().is_empty()).await;
    runner.dispatch(SessionEvent::TopicSelected(TOPIC));
    runner.run_until(|s| !s.lessons().is_empty()).await;
    runner.dispatch(SessionEvent::LessonSelected(LESSON));
}

/// Walk the hierarchy down to a started attempt with the first question's answers loaded.
async fn begin(runner: &mut AttemptRunner) {
    open_lesson(runner).await;
    runner.run_until(answers_shown).await;
}

fn answer_current(runner: &mut AttemptRunner, correct: bool) {
    let question = runner
        .session()
        .current_question()
        .expect("question on screen")
        .question_id;
    let answer = if correct {
        correct_answer(question)
    } else {
        wrong_answer(question)
    };
    runner.dispatch(SessionEvent::AnswerSelected(answer));
}

async fn go_next(runner: &mut AttemptRunner) {
    runner.dispatch(SessionEvent::Navigate(Direction::Next));
    runner.run_until(answers_shown).await;
}

#[tokio::test(start_paused = true)]
async fn attempt_flow_submits_and_reports_outcome() {
    let repo = seeded(3);
    let mut runner = runner(&repo, 300);
    begin(&mut runner).await;

    assert_eq!(runner.session().phase(), SessionPhase::InProgress);
    assert!(runner.timer_running());

    answer_current(&mut runner, true);
    go_next(&mut runner).await;
    answer_current(&mut runner, true);
    go_next(&mut runner).await;
    answer_current(&mut runner, true);

    runner.dispatch(SessionEvent::SubmitRequested);
    runner
        .run_until(|s| s.phase() == SessionPhase::Terminated)
        .await;

    let outcome = runner.outcome().expect("outcome after termination");
    assert!(outcome.passed);
    assert_eq!(outcome.score, 15);
    assert_eq!(outcome.percent_correct(), 100);
    assert_eq!(outcome.headline, "Congratulations! You passed the quiz.");
    assert_eq!(
        outcome.certificate_url.as_deref(),
        Some("memory://certificates/1")
    );
    assert!(!runner.timer_running());

    let submissions = repo.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].tally.correct, 3);
    assert_eq!(submissions[0].context.topic_id, TOPIC);
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_has_no_certificate() {
    let repo = seeded(2);
    let mut runner = runner(&repo, 300);
    begin(&mut runner).await;

    answer_current(&mut runner, false);
    go_next(&mut runner).await;
    answer_current(&mut runner, true);
    runner.dispatch(SessionEvent::SubmitRequested);
    runner
        .run_until(|s| s.phase() == SessionPhase::Terminated)
        .await;

    let outcome = runner.outcome().unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.score, 5);
    assert_eq!(outcome.certificate_url, None);
    assert_eq!(outcome.headline, "Better luck next time.");
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_submits_whatever_is_answered() {
    let repo = seeded(5);
    let mut runner = runner(&repo, 60);
    begin(&mut runner).await;

    for correct in [true, true, true, false] {
        answer_current(&mut runner, correct);
        go_next(&mut runner).await;
    }
    runner
        .run_until(|s| s.phase() == SessionPhase::Terminated)
        .await;

    let submissions = repo.submissions();
    assert_eq!(submissions.len(), 1);
    let record = &submissions[0];
    assert_eq!(record.context.total_questions, 5);
    assert_eq!(record.tally.attempted, 4);
    assert_eq!(record.tally.correct, 3);
    assert_eq!(record.tally.incorrect, 1);
    assert!(!record.passed);
    assert_eq!(record.remaining_seconds, 0);
    assert_eq!(record.minutes_taken(), 1);
    assert_eq!(runner.session().remaining_seconds(), Some(0));
}

#[tokio::test(start_paused = true)]
async fn failed_submission_is_retried_with_same_record() {
    let repo = seeded(1);
    repo.fail_next_submissions(1);
    let mut runner = runner(&repo, 300);
    begin(&mut runner).await;

    assert!(matches!(
        runner.retry_submission(),
        Err(SessionError::NotSubmitting)
    ));

    answer_current(&mut runner, true);
    runner.dispatch(SessionEvent::SubmitRequested);
    runner.run_until(|s| s.last_failure().is_some()).await;

    assert_eq!(runner.session().phase(), SessionPhase::Submitting);
    assert!(repo.submissions().is_empty());
    let frozen = runner.session().submission().cloned().unwrap();

    runner.retry_submission().unwrap();
    assert!(matches!(
        runner.retry_submission(),
        Err(SessionError::SubmissionInFlight)
    ));
    runner
        .run_until(|s| s.phase() == SessionPhase::Terminated)
        .await;

    assert_eq!(repo.submissions(), vec![frozen]);
}

#[tokio::test(start_paused = true)]
async fn changing_subject_mid_attempt_resets_session() {
    let repo = seeded(3);
    let mut runner = runner(&repo, 300);
    begin(&mut runner).await;
    answer_current(&mut runner, true);

    runner.dispatch(SessionEvent::SubjectSelected(SUBJECT));

    assert_eq!(runner.session().phase(), SessionPhase::Configuring);
    assert!(runner.session().ledger().is_none());
    assert!(!runner.timer_running());

    runner.run_until(|s| !s.topics().is_empty()).await;
    assert!(runner.session().lessons().is_empty());
}

#[tokio::test]
async fn failed_catalog_load_is_recoverable() {
    let repo = seeded(1);
    repo.fail(CatalogLevel::Topics);
    let mut runner = runner(&repo, 300);
    runner.start();
    runner.run_until(|s| !s.subjects().is_empty()).await;

    runner.dispatch(SessionEvent::SubjectSelected(SUBJECT));
    runner
        .run_until(|s| !s.catalog().is_loading(CatalogLevel::Topics))
        .await;
    assert!(runner.session().topics().is_empty());
    assert_eq!(runner.session().phase(), SessionPhase::Configuring);

    repo.restore(CatalogLevel::Topics);
    runner.reload();
    runner.run_until(|s| !s.topics().is_empty()).await;
    assert_eq!(runner.session().topics()[0].id, TOPIC);
}

#[tokio::test(start_paused = true)]
async fn failed_answers_load_is_recoverable() {
    let repo = seeded(2);
    repo.fail(CatalogLevel::Answers);
    let mut runner = runner(&repo, 300);
    open_lesson(&mut runner).await;
    runner
        .run_until(|s| s.phase() == SessionPhase::InProgress && !s.answers_loading())
        .await;

    assert!(runner.session().answer_options().is_empty());
    answer_current(&mut runner, true);
    assert!(runner.session().ledger().is_some_and(|ledger| ledger.is_empty()));
    assert_eq!(runner.session().highlighted(), None);

    repo.restore(CatalogLevel::Answers);
    runner.reload();
    runner.run_until(answers_shown).await;
    assert_eq!(
        runner.session().current_question().map(|q| q.question_id),
        Some(QuestionId::new(1))
    );

    answer_current(&mut runner, true);
    let ledger = runner.session().ledger().expect("attempt in progress");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.reduce().correct, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_questions_load_is_recoverable() {
    let repo = seeded(2);
    repo.fail(CatalogLevel::Questions);
    let mut runner = runner(&repo, 300);
    open_lesson(&mut runner).await;
    runner
        .run_until(|s| !s.catalog().is_loading(CatalogLevel::Questions))
        .await;

    assert_eq!(runner.session().phase(), SessionPhase::Configuring);
    assert!(runner.session().sequence().is_empty());
    assert!(!runner.timer_running());

    repo.restore(CatalogLevel::Questions);
    runner.reload();
    assert!(runner.session().catalog().is_loading(CatalogLevel::Questions));
    runner.run_until(answers_shown).await;

    assert_eq!(runner.session().phase(), SessionPhase::InProgress);
    assert_eq!(runner.session().sequence().len(), 2);
    assert!(runner.timer_running());
}

#[tokio::test(start_paused = true)]
async fn unreachable_condition_is_bounded_by_timeout() {
    let repo = seeded(0);
    let mut runner = runner(&repo, 300);
    open_lesson(&mut runner).await;

    let waited = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        runner.run_until(answers_shown),
    )
    .await;

    assert!(waited.is_err());
    assert_eq!(runner.session().phase(), SessionPhase::Configuring);
    assert!(!runner.session().catalog().is_loading(CatalogLevel::Questions));
}

#[tokio::test(start_paused = true)]
async fn abandoned_runner_stops_ticking() {
    let repo = seeded(2);
    let mut runner = runner(&repo, 300);
    begin(&mut runner).await;

    let before = runner.session().remaining_seconds();
    runner.abandon();
    tokio::time::advance(std::time::Duration::from_secs(10)).await;

    assert!(!runner.timer_running());
    assert!(runner.session().is_closed());
    assert_eq!(runner.session().remaining_seconds(), before);
    assert!(runner.outcome().is_none());
}
