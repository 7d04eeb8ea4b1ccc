use quiz_core::model::{AnswerId, AttemptId, LessonId, SubjectId, SubmissionRecord, TopicId};
use remote::RemoteError;

use crate::catalog_loader::{CatalogRequest, CatalogResponse};

/// Navigation direction within the question sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Everything that can happen to a quiz session.
#[derive(Debug)]
pub enum SessionEvent {
    SubjectSelected(SubjectId),
    TopicSelected(TopicId),
    LessonSelected(LessonId),
    QuestionCountChanged(u32),
    /// Undo the deepest catalog choice while configuring.
    SelectionBack,
    Loaded(CatalogResponse),
    AnswerSelected(AnswerId),
    Navigate(Direction),
    Tick,
    SubmitRequested,
    RetrySubmission,
    SubmissionSucceeded(AttemptId),
    SubmissionFailed(RemoteError),
    Abandoned,
}

/// Work the session asks its host to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    Fetch(CatalogRequest),
    StartTimer,
    StopTimer,
    Submit(SubmissionRecord),
}
