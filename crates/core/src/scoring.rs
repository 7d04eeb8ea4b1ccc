use thiserror::Error;

use crate::model::LedgerTally;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("pass threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(u32),
}

/// Fixed-weight scoring with a percentage pass mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    points_per_correct: u32,
    pass_threshold_percent: u32,
}

/// Result of applying a `ScoringPolicy` to a tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub points: u32,
    pub passed: bool,
}

impl ScoringPolicy {
    pub const DEFAULT_POINTS_PER_CORRECT: u32 = 5;
    pub const DEFAULT_PASS_THRESHOLD_PERCENT: u32 = 70;

    /// # Errors
    ///
    /// Returns `ScoringError::InvalidThreshold` if the threshold exceeds 100.
    pub fn new(points_per_correct: u32, pass_threshold_percent: u32) -> Result<Self, ScoringError> {
        if pass_threshold_percent > 100 {
            return Err(ScoringError::InvalidThreshold(pass_threshold_percent));
        }
        Ok(Self {
            points_per_correct,
            pass_threshold_percent,
        })
    }

    #[must_use]
    pub fn points_per_correct(&self) -> u32 {
        self.points_per_correct
    }

    #[must_use]
    pub fn pass_threshold_percent(&self) -> u32 {
        self.pass_threshold_percent
    }

    /// Score a tally against the full sequence length.
    ///
    /// Unanswered questions count against the pass ratio. An empty sequence never passes.
    #[must_use]
    pub fn score(&self, tally: LedgerTally, total_questions: u32) -> Score {
        let points = tally.correct.saturating_mul(self.points_per_correct);
        // correct / total * 100 >= threshold, kept in integers
        let passed = total_questions > 0
            && u64::from(tally.correct) * 100
                >= u64::from(self.pass_threshold_percent) * u64::from(total_questions);
        Score { points, passed }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            points_per_correct: Self::DEFAULT_POINTS_PER_CORRECT,
            pass_threshold_percent: Self::DEFAULT_PASS_THRESHOLD_PERCENT,
        }
    }
}
