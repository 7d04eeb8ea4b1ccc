//! JSON shapes spoken by the catalog service.

use quiz_core::model::{
    AnswerId, AnswerOption, AttemptId, Lesson, LessonId, QuestionId, QuestionRef,
    SubmissionRecord, Subject, SubjectId, Topic, TopicId,
};
use serde::{Deserialize, Serialize};

use crate::repository::RemoteError;

/// List responses arrive either bare or wrapped in a reference-preserving envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(rename = "$values", default = "Vec::new")]
        values: Vec<T>,
    },
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(values) | ListEnvelope::Wrapped { values } => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubjectDto {
    sub_id: u64,
    #[serde(default)]
    sub_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TopicDto {
    topic_id: u64,
    #[serde(default)]
    topic_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LessonDto {
    lesson_id: u64,
    #[serde(default)]
    lesson_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionDto {
    question_id: u64,
    #[serde(default)]
    question_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerDto {
    answer_id: u64,
    #[serde(default)]
    answer_text: Option<String>,
    #[serde(default)]
    is_correct: bool,
}

impl From<SubjectDto> for Subject {
    fn from(dto: SubjectDto) -> Self {
        Subject::new(SubjectId::new(dto.sub_id), dto.sub_name.unwrap_or_default())
    }
}

impl From<TopicDto> for Topic {
    fn from(dto: TopicDto) -> Self {
        Topic::new(TopicId::new(dto.topic_id), dto.topic_name.unwrap_or_default())
    }
}

impl From<LessonDto> for Lesson {
    fn from(dto: LessonDto) -> Self {
        Lesson::new(LessonId::new(dto.lesson_id), dto.lesson_name.unwrap_or_default())
    }
}

impl From<QuestionDto> for QuestionRef {
    fn from(dto: QuestionDto) -> Self {
        QuestionRef::new(
            QuestionId::new(dto.question_id),
            dto.question_text.unwrap_or_default(),
        )
    }
}

impl From<AnswerDto> for AnswerOption {
    fn from(dto: AnswerDto) -> Self {
        AnswerOption::new(
            AnswerId::new(dto.answer_id),
            dto.answer_text.unwrap_or_default(),
            dto.is_correct,
        )
    }
}

//
// ─── SUBMISSION ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizResultDto {
    question_id: u64,
    selected_answer_id: u64,
    time_taken_in_sec: u32,
    is_correct: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitAttemptRequest {
    id: u64,
    quiz_id: u64,
    sub_id: u64,
    student_id: u64,
    exam_duration_in_min: u32,
    total_exam_taken_duration_in_min: u32,
    total_questions: u32,
    total_attempted_questions: u32,
    total_correct_answers: u32,
    total_incorrect_answers: u32,
    total_score: u32,
    is_passed: bool,
    quiz_date_time: String,
    message: String,
    quiz_results: Vec<QuizResultDto>,
}

impl SubmitAttemptRequest {
    pub(crate) fn from_record(record: &SubmissionRecord) -> Self {
        Self {
            id: 0,
            quiz_id: record.context.topic_id.value(),
            sub_id: record.context.subject_id.value(),
            student_id: record.context.student_id.value(),
            exam_duration_in_min: record.exam_duration_minutes(),
            total_exam_taken_duration_in_min: record.minutes_taken(),
            total_questions: record.context.total_questions,
            total_attempted_questions: record.tally.attempted,
            total_correct_answers: record.tally.correct,
            total_incorrect_answers: record.tally.incorrect,
            total_score: record.score,
            is_passed: record.passed,
            quiz_date_time: record.submitted_at.to_rfc3339(),
            message: record.message.clone(),
            quiz_results: record
                .results
                .iter()
                .map(|result| QuizResultDto {
                    question_id: result.question_id.value(),
                    selected_answer_id: result.selected_answer_id.value(),
                    time_taken_in_sec: result.time_taken_seconds,
                    is_correct: result.is_correct,
                })
                .collect(),
        }
    }
}

/// Pull the assigned attempt id out of a submit response.
///
/// The service answers with the stored attempt; an empty or id-less body maps to 0.
pub(crate) fn parse_attempt_id(body: &[u8]) -> Result<AttemptId, RemoteError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AttemptId::new(0));
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
    let id = ["id", "attemptId", "quizAttemptId"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_u64))
        .or_else(|| value.as_u64())
        .unwrap_or(0);
    Ok(AttemptId::new(id))
}
