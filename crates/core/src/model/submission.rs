use chrono::{DateTime, Utc};

use crate::model::attempt::{AttemptLedger, LedgerTally};
use crate::model::ids::{AnswerId, QuestionId, StudentId, SubjectId, TopicId};
use crate::scoring::ScoringPolicy;

pub const PASSED_MESSAGE: &str = "Congratulations! You passed the quiz.";
pub const FAILED_MESSAGE: &str = "Better luck next time.";

/// Identity and configuration of an attempt, fixed when the sequence is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    pub subject_id: SubjectId,
    pub topic_id: TopicId,
    pub student_id: StudentId,
    pub exam_duration_seconds: u32,
    pub total_questions: u32,
}

/// Per-question line of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub selected_answer_id: AnswerId,
    pub time_taken_seconds: u32,
    pub is_correct: bool,
}

/// The finished attempt handed to the submission endpoint.
///
/// Built once at the terminal transition; a retry re-sends the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub context: AttemptContext,
    pub remaining_seconds: u32,
    pub tally: LedgerTally,
    pub score: u32,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
    pub message: String,
    pub results: Vec<QuestionResult>,
}

impl SubmissionRecord {
    /// Reduce the final ledger into a submission.
    #[must_use]
    pub fn reduce(
        context: AttemptContext,
        ledger: &AttemptLedger,
        policy: &ScoringPolicy,
        remaining_seconds: u32,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let tally = ledger.reduce();
        let score = policy.score(tally, context.total_questions);
        let message = if score.passed {
            PASSED_MESSAGE
        } else {
            FAILED_MESSAGE
        };
        let results = ledger
            .entries()
            .iter()
            .map(|entry| QuestionResult {
                question_id: entry.question_id,
                selected_answer_id: entry.selected_answer_id,
                time_taken_seconds: entry.time_taken_seconds,
                is_correct: entry.is_correct,
            })
            .collect();

        Self {
            context,
            remaining_seconds: remaining_seconds.min(context.exam_duration_seconds),
            tally,
            score: score.points,
            passed: score.passed,
            submitted_at,
            message: message.to_owned(),
            results,
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.context
            .exam_duration_seconds
            .saturating_sub(self.remaining_seconds)
    }

    #[must_use]
    pub fn exam_duration_minutes(&self) -> u32 {
        self.context.exam_duration_seconds / 60
    }

    /// Whole minutes consumed, counted as configured minutes minus full minutes left.
    #[must_use]
    pub fn minutes_taken(&self) -> u32 {
        self.exam_duration_minutes()
            .saturating_sub(self.remaining_seconds / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn context(total_questions: u32) -> AttemptContext {
        AttemptContext {
            subject_id: SubjectId::new(1),
            topic_id: TopicId::new(2),
            student_id: StudentId::new(3),
            exam_duration_seconds: 300,
            total_questions,
        }
    }

    #[test]
    fn timeout_with_partial_answers_fails() {
        let mut ledger = AttemptLedger::new((1..=5).map(QuestionId::new));
        for id in 1..=3 {
            ledger
                .record_selection(QuestionId::new(id), AnswerId::new(id * 10), true)
                .unwrap();
        }
        ledger
            .record_selection(QuestionId::new(4), AnswerId::new(41), false)
            .unwrap();

        let record = SubmissionRecord::reduce(
            context(5),
            &ledger,
            &ScoringPolicy::default(),
            0,
            fixed_now(),
        );

        assert_eq!(record.tally.attempted, 4);
        assert_eq!(record.tally.correct, 3);
        assert_eq!(record.tally.incorrect, 1);
        assert_eq!(record.context.total_questions, 5);
        assert!(!record.passed);
        assert_eq!(record.message, FAILED_MESSAGE);
        assert_eq!(record.results.len(), 4);
        assert_eq!(record.minutes_taken(), 5);
        assert_eq!(record.elapsed_seconds(), 300);
    }

    #[test]
    fn zero_answers_is_a_valid_submission() {
        let ledger = AttemptLedger::new((1..=3).map(QuestionId::new));
        let record = SubmissionRecord::reduce(
            context(3),
            &ledger,
            &ScoringPolicy::default(),
            0,
            fixed_now(),
        );

        assert_eq!(record.tally, LedgerTally::default());
        assert_eq!(record.score, 0);
        assert!(!record.passed);
        assert!(record.results.is_empty());
    }

    #[test]
    fn minutes_taken_counts_partial_minutes() {
        let ledger = AttemptLedger::new([QuestionId::new(1)]);
        let record = SubmissionRecord::reduce(
            context(1),
            &ledger,
            &ScoringPolicy::default(),
            250,
            fixed_now(),
        );

        assert_eq!(record.exam_duration_minutes(), 5);
        assert_eq!(record.minutes_taken(), 1);
        assert_eq!(record.elapsed_seconds(), 50);
    }
}
