use std::collections::HashMap;

use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("question {0} is not part of this attempt")]
    UnknownQuestion(QuestionId),
}

//
// ─── ENTRIES ──────────────────────────────────────────────────────────────────
//

/// The student's latest choice for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptEntry {
    pub question_id: QuestionId,
    pub selected_answer_id: AnswerId,
    pub is_correct: bool,
    pub time_taken_seconds: u32,
}

/// What `AttemptLedger::record_selection` did with a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    Replaced,
    Unchanged,
}

/// Aggregate counts over the ledger.
///
/// `attempted == correct + incorrect` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTally {
    pub attempted: u32,
    pub correct: u32,
    pub incorrect: u32,
}

//
// ─── LEDGER ───────────────────────────────────────────────────────────────────
//

/// In-memory record of an attempt's answers, keyed by question.
///
/// The ledger only accepts questions from the sequence it was created for, so its size
/// never exceeds the sequence length. Entries keep the order in which each question was
/// first answered; re-answering overwrites in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptLedger {
    entries: Vec<AttemptEntry>,
    dwell_seconds: HashMap<QuestionId, u32>,
}

impl AttemptLedger {
    /// Create an empty ledger for the given question sequence.
    #[must_use]
    pub fn new(questions: impl IntoIterator<Item = QuestionId>) -> Self {
        Self {
            entries: Vec::new(),
            dwell_seconds: questions.into_iter().map(|id| (id, 0)).collect(),
        }
    }

    /// Insert or overwrite the entry for `question_id`.
    ///
    /// The entry's `time_taken_seconds` is the dwell time accumulated on the question so far.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownQuestion` if the question is outside the sequence.
    pub fn record_selection(
        &mut self,
        question_id: QuestionId,
        selected_answer_id: AnswerId,
        is_correct: bool,
    ) -> Result<RecordOutcome, LedgerError> {
        let Some(&time_taken_seconds) = self.dwell_seconds.get(&question_id) else {
            return Err(LedgerError::UnknownQuestion(question_id));
        };
        let entry = AttemptEntry {
            question_id,
            selected_answer_id,
            is_correct,
            time_taken_seconds,
        };

        match self
            .entries
            .iter_mut()
            .find(|existing| existing.question_id == question_id)
        {
            Some(existing) if *existing == entry => Ok(RecordOutcome::Unchanged),
            Some(existing) => {
                *existing = entry;
                Ok(RecordOutcome::Replaced)
            }
            None => {
                self.entries.push(entry);
                Ok(RecordOutcome::Inserted)
            }
        }
    }

    /// Attribute elapsed seconds to the question currently on screen.
    ///
    /// Unknown questions are ignored.
    pub fn note_dwell(&mut self, question_id: QuestionId, seconds: u32) {
        if let Some(total) = self.dwell_seconds.get_mut(&question_id) {
            *total = total.saturating_add(seconds);
        }
    }

    #[must_use]
    pub fn dwell_seconds(&self, question_id: QuestionId) -> u32 {
        self.dwell_seconds.get(&question_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn entry(&self, question_id: QuestionId) -> Option<&AttemptEntry> {
        self.entries
            .iter()
            .find(|entry| entry.question_id == question_id)
    }

    #[must_use]
    pub fn entries(&self) -> &[AttemptEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count attempted, correct, and incorrect answers.
    #[must_use]
    pub fn reduce(&self) -> LedgerTally {
        let attempted = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        let correct = u32::try_from(self.entries.iter().filter(|e| e.is_correct).count())
            .unwrap_or(u32::MAX);
        LedgerTally {
            attempted,
            correct,
            incorrect: attempted - correct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(len: u64) -> AttemptLedger {
        AttemptLedger::new((1..=len).map(QuestionId::new))
    }

    #[test]
    fn first_selection_inserts_entry() {
        let mut ledger = ledger(3);
        let outcome = ledger
            .record_selection(QuestionId::new(2), AnswerId::new(20), true)
            .unwrap();

        assert_eq!(outcome, RecordOutcome::Inserted);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.entry(QuestionId::new(2)).unwrap().is_correct);
    }

    #[test]
    fn reselecting_replaces_without_duplicating() {
        let mut ledger = ledger(3);
        ledger
            .record_selection(QuestionId::new(1), AnswerId::new(10), true)
            .unwrap();
        ledger
            .record_selection(QuestionId::new(2), AnswerId::new(20), true)
            .unwrap();

        let outcome = ledger
            .record_selection(QuestionId::new(1), AnswerId::new(11), false)
            .unwrap();

        assert_eq!(outcome, RecordOutcome::Replaced);
        assert_eq!(ledger.len(), 2);
        let first = ledger.entry(QuestionId::new(1)).unwrap();
        assert_eq!(first.selected_answer_id, AnswerId::new(11));
        assert!(!first.is_correct);
        assert_eq!(
            ledger.entry(QuestionId::new(2)).unwrap().selected_answer_id,
            AnswerId::new(20)
        );
        assert_eq!(ledger.entries()[0].question_id, QuestionId::new(1));
    }

    #[test]
    fn identical_selection_is_idempotent() {
        let mut ledger = ledger(1);
        ledger
            .record_selection(QuestionId::new(1), AnswerId::new(10), true)
            .unwrap();
        let before = ledger.clone();

        let outcome = ledger
            .record_selection(QuestionId::new(1), AnswerId::new(10), true)
            .unwrap();

        assert_eq!(outcome, RecordOutcome::Unchanged);
        assert_eq!(ledger, before);
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut ledger = ledger(2);
        let err = ledger
            .record_selection(QuestionId::new(99), AnswerId::new(1), true)
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownQuestion(QuestionId::new(99)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn size_never_exceeds_sequence_and_counts_stay_consistent() {
        let mut ledger = ledger(4);
        for round in 0_u64..40 {
            let question = QuestionId::new(round % 6 + 1);
            let _ = ledger.record_selection(question, AnswerId::new(round), round % 3 == 0);

            let tally = ledger.reduce();
            assert!(ledger.len() <= 4);
            assert_eq!(tally.attempted, tally.correct + tally.incorrect);
            assert_eq!(tally.attempted as usize, ledger.len());
        }
    }

    #[test]
    fn entry_records_dwell_time_at_selection() {
        let mut ledger = ledger(2);
        ledger.note_dwell(QuestionId::new(1), 4);
        ledger.note_dwell(QuestionId::new(42), 9);
        ledger
            .record_selection(QuestionId::new(1), AnswerId::new(10), true)
            .unwrap();

        assert_eq!(ledger.entry(QuestionId::new(1)).unwrap().time_taken_seconds, 4);
        assert_eq!(ledger.dwell_seconds(QuestionId::new(42)), 0);
    }

    #[test]
    fn empty_ledger_reduces_to_zero() {
        assert_eq!(ledger(5).reduce(), LedgerTally::default());
    }
}
