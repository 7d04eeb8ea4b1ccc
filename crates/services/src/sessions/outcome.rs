use chrono::{DateTime, Utc};

use quiz_core::model::{AttemptId, LedgerTally};

/// Presentation-agnostic result of a terminated attempt.
///
/// Built from the submitted record plus the id the service assigned. No pre-formatted
/// strings beyond the service's own pass/fail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub attempt_id: AttemptId,
    pub headline: String,
    pub passed: bool,
    pub score: u32,
    pub tally: LedgerTally,
    pub total_questions: u32,
    pub minutes_taken: u32,
    pub submitted_at: DateTime<Utc>,
    /// Download link for the certificate; only present for a passed attempt.
    pub certificate_url: Option<String>,
}

impl AttemptOutcome {
    /// Whole-number percentage of questions answered correctly.
    #[must_use]
    pub fn percent_correct(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        self.tally.correct.saturating_mul(100) / self.total_questions
    }
}
