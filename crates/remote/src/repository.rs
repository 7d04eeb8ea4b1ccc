use async_trait::async_trait;
use quiz_core::model::{
    AnswerOption, AttemptId, Lesson, LessonId, QuestionId, QuestionQuery, QuestionRef, Subject,
    SubjectId, SubmissionRecord, Topic, TopicId,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by remote adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// The read endpoints a quiz attempt depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogLevel {
    Subjects,
    Topics,
    Lessons,
    Questions,
    Answers,
}

impl fmt::Display for CatalogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogLevel::Subjects => "subjects",
            CatalogLevel::Topics => "topics",
            CatalogLevel::Lessons => "lessons",
            CatalogLevel::Questions => "questions",
            CatalogLevel::Answers => "answers",
        };
        f.write_str(name)
    }
}

/// Read-only access to the quiz catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError` if the catalog cannot be reached or decoded.
    async fn list_subjects(&self) -> Result<Vec<Subject>, RemoteError>;

    /// # Errors
    ///
    /// Returns `RemoteError` if the catalog cannot be reached or decoded.
    async fn list_topics(&self, subject: SubjectId) -> Result<Vec<Topic>, RemoteError>;

    /// # Errors
    ///
    /// Returns `RemoteError` if the catalog cannot be reached or decoded.
    async fn list_lessons(&self, topic: TopicId) -> Result<Vec<Lesson>, RemoteError>;

    /// List questions for a lesson, bounded by `query.count`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the catalog cannot be reached or decoded.
    async fn list_questions(&self, query: QuestionQuery) -> Result<Vec<QuestionRef>, RemoteError>;

    /// # Errors
    ///
    /// Returns `RemoteError` if the catalog cannot be reached or decoded.
    async fn list_answers(&self, question: QuestionId) -> Result<Vec<AnswerOption>, RemoteError>;
}

/// Write access for finished attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Submit a finished attempt and return the identifier assigned to it.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the attempt was not accepted.
    async fn submit_attempt(&self, record: &SubmissionRecord) -> Result<AttemptId, RemoteError>;

    /// Where a passed attempt's certificate can be downloaded, if the backend offers one.
    fn certificate_url(&self, _attempt: AttemptId) -> Option<String> {
        None
    }
}

//
// ─── IN-MEMORY BACKEND ────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Catalog {
    subjects: Vec<Subject>,
    topics: HashMap<SubjectId, Vec<Topic>>,
    lessons: HashMap<TopicId, Vec<Lesson>>,
    questions: HashMap<(SubjectId, TopicId, LessonId), Vec<QuestionRef>>,
    answers: HashMap<QuestionId, Vec<AnswerOption>>,
    failing: HashSet<CatalogLevel>,
}

#[derive(Default)]
struct Submissions {
    accepted: Vec<SubmissionRecord>,
    failures_remaining: u32,
    next_id: u64,
}

/// In-memory catalog and submission sink for tests and offline demos.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    catalog: Arc<Mutex<Catalog>>,
    submissions: Arc<Mutex<Submissions>>,
}

fn poisoned<E: fmt::Display>(e: E) -> RemoteError {
    RemoteError::Unavailable(e.to_string())
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_catalog(&self, f: impl FnOnce(&mut Catalog)) {
        if let Ok(mut guard) = self.catalog.lock() {
            f(&mut guard);
        }
    }

    pub fn add_subject(&self, subject: Subject) {
        self.with_catalog(|c| c.subjects.push(subject));
    }

    pub fn add_topic(&self, subject: SubjectId, topic: Topic) {
        self.with_catalog(|c| c.topics.entry(subject).or_default().push(topic));
    }

    pub fn add_lesson(&self, topic: TopicId, lesson: Lesson) {
        self.with_catalog(|c| c.lessons.entry(topic).or_default().push(lesson));
    }

    pub fn add_question(
        &self,
        subject: SubjectId,
        topic: TopicId,
        lesson: LessonId,
        question: QuestionRef,
    ) {
        self.with_catalog(|c| {
            c.questions
                .entry((subject, topic, lesson))
                .or_default()
                .push(question);
        });
    }

    pub fn set_answers(&self, question: QuestionId, answers: Vec<AnswerOption>) {
        self.with_catalog(|c| {
            c.answers.insert(question, answers);
        });
    }

    /// Make every request for `level` fail until `restore` is called.
    pub fn fail(&self, level: CatalogLevel) {
        self.with_catalog(|c| {
            c.failing.insert(level);
        });
    }

    pub fn restore(&self, level: CatalogLevel) {
        self.with_catalog(|c| {
            c.failing.remove(&level);
        });
    }

    /// Reject the next `count` submissions.
    pub fn fail_next_submissions(&self, count: u32) {
        if let Ok(mut guard) = self.submissions.lock() {
            guard.failures_remaining = count;
        }
    }

    /// Attempts accepted so far, in submission order.
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.submissions
            .lock()
            .map(|guard| guard.accepted.clone())
            .unwrap_or_default()
    }

    fn read<T>(
        &self,
        level: CatalogLevel,
        f: impl FnOnce(&Catalog) -> T,
    ) -> Result<T, RemoteError> {
        let guard = self.catalog.lock().map_err(poisoned)?;
        if guard.failing.contains(&level) {
            return Err(RemoteError::Unavailable(format!("{level} endpoint is down")));
        }
        Ok(f(&guard))
    }
}

#[async_trait]
impl CatalogRepository for InMemoryBackend {
    async fn list_subjects(&self) -> Result<Vec<Subject>, RemoteError> {
        self.read(CatalogLevel::Subjects, |c| c.subjects.clone())
    }

    async fn list_topics(&self, subject: SubjectId) -> Result<Vec<Topic>, RemoteError> {
        self.read(CatalogLevel::Topics, |c| {
            c.topics.get(&subject).cloned().unwrap_or_default()
        })
    }

    async fn list_lessons(&self, topic: TopicId) -> Result<Vec<Lesson>, RemoteError> {
        self.read(CatalogLevel::Lessons, |c| {
            c.lessons.get(&topic).cloned().unwrap_or_default()
        })
    }

    async fn list_questions(&self, query: QuestionQuery) -> Result<Vec<QuestionRef>, RemoteError> {
        let limit = usize::try_from(query.count).unwrap_or(usize::MAX);
        self.read(CatalogLevel::Questions, |c| {
            c.questions
                .get(&(query.subject, query.topic, query.lesson))
                .map(|questions| questions.iter().take(limit).cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn list_answers(&self, question: QuestionId) -> Result<Vec<AnswerOption>, RemoteError> {
        self.read(CatalogLevel::Answers, |c| {
            c.answers.get(&question).cloned().unwrap_or_default()
        })
    }
}

#[async_trait]
impl AttemptRepository for InMemoryBackend {
    async fn submit_attempt(&self, record: &SubmissionRecord) -> Result<AttemptId, RemoteError> {
        let mut guard = self.submissions.lock().map_err(poisoned)?;
        if guard.failures_remaining > 0 {
            guard.failures_remaining -= 1;
            return Err(RemoteError::Unavailable("submission rejected".into()));
        }
        guard.next_id += 1;
        guard.accepted.push(record.clone());
        Ok(AttemptId::new(guard.next_id))
    }
}

/// Aggregates catalog and attempt endpoints behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Backend {
    pub catalog: Arc<dyn CatalogRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Backend {
    #[must_use]
    pub fn in_memory(repo: InMemoryBackend) -> Self {
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { catalog, attempts }
    }
}
