mod attempt;
mod catalog;
mod ids;
mod submission;

pub use ids::{
    AnswerId, AttemptId, LessonId, ParseIdError, QuestionId, StudentId, SubjectId, TopicId,
};

pub use attempt::{AttemptEntry, AttemptLedger, LedgerError, LedgerTally, RecordOutcome};
pub use catalog::{
    AnswerOption, CatalogNode, DEFAULT_QUESTION_COUNT, Lesson, QUESTION_COUNT_CHOICES,
    QuestionQuery, QuestionRef, Subject, Topic,
};
pub use submission::{
    AttemptContext, FAILED_MESSAGE, PASSED_MESSAGE, QuestionResult, SubmissionRecord,
};
