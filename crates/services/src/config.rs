use std::env;

use quiz_core::ScoringPolicy;
use quiz_core::model::{DEFAULT_QUESTION_COUNT, StudentId};

use crate::error::ConfigError;
use crate::sessions::SessionSettings;

pub const DEFAULT_API_BASE_URL: &str = "https://localhost:7285/api";
pub const DEFAULT_STUDENT_ID: u64 = 2;
pub const DEFAULT_EXAM_MINUTES: u32 = 5;

const API_BASE_URL: &str = "QUIZ_API_BASE_URL";
const STUDENT_ID: &str = "QUIZ_STUDENT_ID";
const EXAM_MINUTES: &str = "QUIZ_EXAM_MINUTES";
const QUESTION_COUNT: &str = "QUIZ_QUESTION_COUNT";
const POINTS_PER_CORRECT: &str = "QUIZ_POINTS_PER_CORRECT";
const PASS_THRESHOLD: &str = "QUIZ_PASS_THRESHOLD";

/// Client-side settings for a quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub api_base_url: String,
    pub student_id: StudentId,
    pub exam_minutes: u32,
    pub question_count: u32,
    pub scoring: ScoringPolicy,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            student_id: StudentId::new(DEFAULT_STUDENT_ID),
            exam_minutes: DEFAULT_EXAM_MINUTES,
            question_count: DEFAULT_QUESTION_COUNT,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl QuizConfig {
    /// Read configuration from `QUIZ_*` environment variables. Unset keys use defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base_url = match lookup(API_BASE_URL) {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::Empty { key: API_BASE_URL });
            }
            Some(value) => value.trim().to_owned(),
            None => defaults.api_base_url,
        };
        let student_id =
            parse_number::<StudentId>(&lookup, STUDENT_ID)?.unwrap_or(defaults.student_id);
        let exam_minutes = parse_positive(&lookup, EXAM_MINUTES)?.unwrap_or(defaults.exam_minutes);
        let question_count =
            parse_positive(&lookup, QUESTION_COUNT)?.unwrap_or(defaults.question_count);
        let points = parse_number::<u32>(&lookup, POINTS_PER_CORRECT)?
            .unwrap_or(ScoringPolicy::DEFAULT_POINTS_PER_CORRECT);
        let threshold = parse_number::<u32>(&lookup, PASS_THRESHOLD)?
            .unwrap_or(ScoringPolicy::DEFAULT_PASS_THRESHOLD_PERCENT);

        Ok(Self {
            api_base_url,
            student_id,
            exam_minutes,
            question_count,
            scoring: ScoringPolicy::new(points, threshold)?,
        })
    }

    #[must_use]
    pub fn exam_duration_seconds(&self) -> u32 {
        self.exam_minutes.saturating_mul(60)
    }

    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            student_id: self.student_id,
            exam_duration_seconds: self.exam_duration_seconds(),
            question_count: self.question_count,
            scoring: self.scoring,
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(ConfigError::NotANumber { key, value: raw }),
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u32>, ConfigError> {
    match parse_number::<u32>(lookup, key)? {
        Some(0) => Err(ConfigError::Zero { key }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_values_use_defaults() {
        let config = QuizConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, QuizConfig::default());
        assert_eq!(config.exam_duration_seconds(), 300);
        assert_eq!(config.session_settings().question_count, 10);
    }

    #[test]
    fn reads_overrides() {
        let config = QuizConfig::from_lookup(lookup(&[
            ("QUIZ_API_BASE_URL", " http://quiz.local/api "),
            ("QUIZ_STUDENT_ID", "41"),
            ("QUIZ_EXAM_MINUTES", "2"),
            ("QUIZ_QUESTION_COUNT", "15"),
            ("QUIZ_POINTS_PER_CORRECT", "10"),
            ("QUIZ_PASS_THRESHOLD", "50"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "http://quiz.local/api");
        assert_eq!(config.student_id, StudentId::new(41));
        assert_eq!(config.exam_duration_seconds(), 120);
        assert_eq!(config.question_count, 15);
        assert_eq!(config.scoring.points_per_correct(), 10);
        assert_eq!(config.scoring.pass_threshold_percent(), 50);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            QuizConfig::from_lookup(lookup(&[("QUIZ_EXAM_MINUTES", "five")])),
            Err(ConfigError::NotANumber { key: "QUIZ_EXAM_MINUTES", .. })
        ));
        assert_eq!(
            QuizConfig::from_lookup(lookup(&[("QUIZ_QUESTION_COUNT", "0")])),
            Err(ConfigError::Zero {
                key: "QUIZ_QUESTION_COUNT"
            })
        );
        assert!(matches!(
            QuizConfig::from_lookup(lookup(&[("QUIZ_PASS_THRESHOLD", "101")])),
            Err(ConfigError::Scoring(_))
        ));
        assert!(matches!(
            QuizConfig::from_lookup(lookup(&[("QUIZ_API_BASE_URL", "  ")])),
            Err(ConfigError::Empty { .. })
        ));
    }
}
