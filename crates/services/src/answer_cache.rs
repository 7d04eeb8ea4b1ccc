use quiz_core::model::{AnswerId, AnswerOption, QuestionId};
use remote::{CatalogLevel, RemoteError};

use crate::catalog_loader::{CatalogRequest, FetchTicket, Level, LoadOutcome};

/// Answer options for the question on screen, and nothing else.
///
/// Loading a new question clears the previous options in the same step, so a selection
/// can never be matched against another question's options.
#[derive(Debug, Clone)]
pub struct AnswerCache {
    question: Option<QuestionId>,
    options: Level<AnswerOption>,
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            question: None,
            options: Level::new(CatalogLevel::Answers),
        }
    }

    /// Evict the current options and request those of `question`.
    pub fn load_for(&mut self, question: QuestionId) -> CatalogRequest {
        self.question = Some(question);
        CatalogRequest::Answers {
            ticket: self.options.request(),
            question,
        }
    }

    pub fn clear(&mut self) {
        self.question = None;
        self.options.invalidate();
    }

    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        question: QuestionId,
        result: Result<Vec<AnswerOption>, RemoteError>,
    ) -> LoadOutcome {
        if self.question != Some(question) {
            tracing::debug!(%question, "discarding answers for a question no longer shown");
            return LoadOutcome::Stale;
        }
        self.options.accept(ticket, result)
    }

    #[must_use]
    pub fn question(&self) -> Option<QuestionId> {
        self.question
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        self.options.items()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.options.is_loading()
    }

    /// Look up an option of the current question.
    #[must_use]
    pub fn option(&self, answer: AnswerId) -> Option<&AnswerOption> {
        self.options
            .items()
            .iter()
            .find(|option| option.answer_id == answer)
    }
}
