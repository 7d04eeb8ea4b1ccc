use quiz_core::model::{
    AnswerOption, Lesson, LessonId, QuestionId, QuestionQuery, QuestionRef, Subject, SubjectId,
    Topic, TopicId,
};
use remote::{CatalogLevel, CatalogRepository, RemoteError};

//
// ─── FETCH TICKETS ────────────────────────────────────────────────────────────
//

/// Identifies one outstanding catalog request.
///
/// A response is applied only while its ticket is still the pending one for its level;
/// anything older is stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub level: CatalogLevel,
    pub generation: u64,
}

/// Whether a response was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Failed,
    Stale,
}

/// Cached items for one catalog level plus its pending request.
#[derive(Debug, Clone)]
pub(crate) struct Level<T> {
    level: CatalogLevel,
    items: Vec<T>,
    pending: Option<u64>,
    generation: u64,
}

impl<T> Level<T> {
    pub(crate) fn new(level: CatalogLevel) -> Self {
        Self {
            level,
            items: Vec::new(),
            pending: None,
            generation: 0,
        }
    }

    /// Drop cached items and issue a fresh ticket, superseding any request in flight.
    pub(crate) fn request(&mut self) -> FetchTicket {
        self.items.clear();
        self.generation += 1;
        self.pending = Some(self.generation);
        FetchTicket {
            level: self.level,
            generation: self.generation,
        }
    }

    /// Drop cached items and forget the pending request.
    pub(crate) fn invalidate(&mut self) {
        self.items.clear();
        self.pending = None;
    }

    pub(crate) fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.level == self.level && self.pending == Some(ticket.generation)
    }

    pub(crate) fn accept(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<T>, RemoteError>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(level = %self.level, generation = ticket.generation, "discarding stale response");
            return LoadOutcome::Stale;
        }
        self.pending = None;
        match result {
            Ok(items) => {
                self.items = items;
                LoadOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(level = %self.level, error = %err, "catalog fetch failed");
                self.items.clear();
                LoadOutcome::Failed
            }
        }
    }

    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

//
// ─── REQUESTS & RESPONSES ─────────────────────────────────────────────────────
//

/// A catalog read the session wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRequest {
    Subjects {
        ticket: FetchTicket,
    },
    Topics {
        ticket: FetchTicket,
        subject: SubjectId,
    },
    Lessons {
        ticket: FetchTicket,
        topic: TopicId,
    },
    Questions {
        ticket: FetchTicket,
        query: QuestionQuery,
    },
    Answers {
        ticket: FetchTicket,
        question: QuestionId,
    },
}

/// The completion of a `CatalogRequest`, tagged with the ticket it was issued under.
#[derive(Debug)]
pub enum CatalogResponse {
    Subjects {
        ticket: FetchTicket,
        result: Result<Vec<Subject>, RemoteError>,
    },
    Topics {
        ticket: FetchTicket,
        result: Result<Vec<Topic>, RemoteError>,
    },
    Lessons {
        ticket: FetchTicket,
        result: Result<Vec<Lesson>, RemoteError>,
    },
    Questions {
        ticket: FetchTicket,
        result: Result<Vec<QuestionRef>, RemoteError>,
    },
    Answers {
        ticket: FetchTicket,
        question: QuestionId,
        result: Result<Vec<AnswerOption>, RemoteError>,
    },
}

impl CatalogRequest {
    #[must_use]
    pub fn ticket(&self) -> FetchTicket {
        match self {
            CatalogRequest::Subjects { ticket }
            | CatalogRequest::Topics { ticket, .. }
            | CatalogRequest::Lessons { ticket, .. }
            | CatalogRequest::Questions { ticket, .. }
            | CatalogRequest::Answers { ticket, .. } => *ticket,
        }
    }

    /// Perform the read against `catalog`. Failures travel inside the response.
    pub async fn execute(self, catalog: &dyn CatalogRepository) -> CatalogResponse {
        match self {
            CatalogRequest::Subjects { ticket } => CatalogResponse::Subjects {
                ticket,
                result: catalog.list_subjects().await,
            },
            CatalogRequest::Topics { ticket, subject } => CatalogResponse::Topics {
                ticket,
                result: catalog.list_topics(subject).await,
            },
            CatalogRequest::Lessons { ticket, topic } => CatalogResponse::Lessons {
                ticket,
                result: catalog.list_lessons(topic).await,
            },
            CatalogRequest::Questions { ticket, query } => CatalogResponse::Questions {
                ticket,
                result: catalog.list_questions(query).await,
            },
            CatalogRequest::Answers { ticket, question } => CatalogResponse::Answers {
                ticket,
                question,
                result: catalog.list_answers(question).await,
            },
        }
    }
}

//
// ─── LOADER ───────────────────────────────────────────────────────────────────
//

/// The student's choices in the Subject → Topic → Lesson hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub subject: Option<SubjectId>,
    pub topic: Option<TopicId>,
    pub lesson: Option<LessonId>,
    pub count: u32,
}

impl Selection {
    /// The question query, once every level is chosen.
    #[must_use]
    pub fn query(&self) -> Option<QuestionQuery> {
        Some(QuestionQuery {
            subject: self.subject?,
            topic: self.topic?,
            lesson: self.lesson?,
            count: self.count,
        })
    }
}

/// Resolves the selection hierarchy into a question sequence.
///
/// Choosing at one level clears every deeper level, including requests still in flight.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    selection: Selection,
    subjects: Level<Subject>,
    topics: Level<Topic>,
    lessons: Level<Lesson>,
    questions: Level<QuestionRef>,
}

impl CatalogLoader {
    #[must_use]
    pub fn new(question_count: u32) -> Self {
        Self {
            selection: Selection {
                subject: None,
                topic: None,
                lesson: None,
                count: question_count.max(1),
            },
            subjects: Level::new(CatalogLevel::Subjects),
            topics: Level::new(CatalogLevel::Topics),
            lessons: Level::new(CatalogLevel::Lessons),
            questions: Level::new(CatalogLevel::Questions),
        }
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn request_subjects(&mut self) -> CatalogRequest {
        CatalogRequest::Subjects {
            ticket: self.subjects.request(),
        }
    }

    pub fn select_subject(&mut self, subject: SubjectId) -> CatalogRequest {
        self.selection.subject = Some(subject);
        self.selection.topic = None;
        self.selection.lesson = None;
        self.lessons.invalidate();
        self.questions.invalidate();
        CatalogRequest::Topics {
            ticket: self.topics.request(),
            subject,
        }
    }

    /// Returns `None` when no subject is chosen yet.
    pub fn select_topic(&mut self, topic: TopicId) -> Option<CatalogRequest> {
        self.selection.subject?;
        self.selection.topic = Some(topic);
        self.selection.lesson = None;
        self.questions.invalidate();
        Some(CatalogRequest::Lessons {
            ticket: self.lessons.request(),
            topic,
        })
    }

    /// Returns `None` when no topic is chosen yet.
    pub fn select_lesson(&mut self, lesson: LessonId) -> Option<CatalogRequest> {
        self.selection.topic?;
        self.selection.lesson = Some(lesson);
        self.request_questions()
    }

    /// Undo the deepest choice so the level above it can be chosen again.
    ///
    /// The list that becomes visible is kept if it is loaded and re-requested if it is
    /// empty, which covers a failed earlier load.
    pub fn step_back(&mut self) -> Option<CatalogRequest> {
        let selection = self.selection;
        match (selection.subject, selection.topic, selection.lesson) {
            (_, Some(topic), Some(_)) => {
                self.selection.lesson = None;
                self.questions.invalidate();
                self.lessons.items.is_empty().then(|| CatalogRequest::Lessons {
                    ticket: self.lessons.request(),
                    topic,
                })
            }
            (Some(subject), Some(_), None) => {
                self.selection.topic = None;
                self.lessons.invalidate();
                self.questions.invalidate();
                self.topics.items.is_empty().then(|| CatalogRequest::Topics {
                    ticket: self.topics.request(),
                    subject,
                })
            }
            (Some(_), None, _) => {
                self.selection.subject = None;
                self.topics.invalidate();
                self.lessons.invalidate();
                self.questions.invalidate();
                self.subjects
                    .items
                    .is_empty()
                    .then(|| self.request_subjects())
            }
            _ => None,
        }
    }

    /// Change the desired question count. Re-requests questions once a lesson is chosen.
    ///
    /// A count of zero is ignored.
    pub fn set_count(&mut self, count: u32) -> Option<CatalogRequest> {
        if count == 0 {
            return None;
        }
        self.selection.count = count;
        self.request_questions()
    }

    fn request_questions(&mut self) -> Option<CatalogRequest> {
        let query = self.selection.query()?;
        Some(CatalogRequest::Questions {
            ticket: self.questions.request(),
            query,
        })
    }

    /// Forget every pending request so late responses are discarded.
    pub fn cancel_pending(&mut self) {
        for pending in [
            &mut self.subjects.pending,
            &mut self.topics.pending,
            &mut self.lessons.pending,
            &mut self.questions.pending,
        ] {
            *pending = None;
        }
    }

    pub fn apply_subjects(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Subject>, RemoteError>,
    ) -> LoadOutcome {
        self.subjects.accept(ticket, result)
    }

    pub fn apply_topics(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Topic>, RemoteError>,
    ) -> LoadOutcome {
        self.topics.accept(ticket, result)
    }

    pub fn apply_lessons(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Lesson>, RemoteError>,
    ) -> LoadOutcome {
        self.lessons.accept(ticket, result)
    }

    /// Apply a question list, trimmed to the requested count.
    pub fn apply_questions(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<QuestionRef>, RemoteError>,
    ) -> LoadOutcome {
        let limit = usize::try_from(self.selection.count).unwrap_or(usize::MAX);
        let result = result.map(|mut questions| {
            questions.truncate(limit);
            questions
        });
        self.questions.accept(ticket, result)
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        self.subjects.items()
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        self.topics.items()
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        self.lessons.items()
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRef] {
        self.questions.items()
    }

    #[must_use]
    pub fn is_loading(&self, level: CatalogLevel) -> bool {
        match level {
            CatalogLevel::Subjects => self.subjects.is_loading(),
            CatalogLevel::Topics => self.topics.is_loading(),
            CatalogLevel::Lessons => self.lessons.is_loading(),
            CatalogLevel::Questions => self.questions.is_loading(),
            CatalogLevel::Answers => false,
        }
    }
}
