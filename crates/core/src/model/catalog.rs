use serde::{Deserialize, Serialize};

use crate::model::ids::{AnswerId, LessonId, QuestionId, SubjectId, TopicId};

//
// ─── CATALOG NODES ────────────────────────────────────────────────────────────
//

/// A named entry in the Subject → Topic → Lesson hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogNode<Id> {
    pub id: Id,
    pub display_name: String,
}

impl<Id> CatalogNode<Id> {
    #[must_use]
    pub fn new(id: Id, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

pub type Subject = CatalogNode<SubjectId>;
pub type Topic = CatalogNode<TopicId>;
pub type Lesson = CatalogNode<LessonId>;

//
// ─── QUESTIONS & ANSWERS ──────────────────────────────────────────────────────
//

/// One question of an attempt's sequence. The catalog's order is the navigation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRef {
    pub question_id: QuestionId,
    pub text: String,
}

impl QuestionRef {
    #[must_use]
    pub fn new(question_id: QuestionId, text: impl Into<String>) -> Self {
        Self {
            question_id,
            text: text.into(),
        }
    }
}

/// A selectable option for exactly one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub answer_id: AnswerId,
    pub text: String,
    pub is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(answer_id: AnswerId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            answer_id,
            text: text.into(),
            is_correct,
        }
    }
}

/// A fully specified request for a question sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestionQuery {
    pub subject: SubjectId,
    pub topic: TopicId,
    pub lesson: LessonId,
    pub count: u32,
}

/// Question counts offered to students when configuring an attempt.
pub const QUESTION_COUNT_CHOICES: [u32; 5] = [2, 5, 10, 15, 20];

/// Question count used when nothing else is configured.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;
