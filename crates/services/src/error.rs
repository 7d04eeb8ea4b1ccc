//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::scoring::ScoringError;
use remote::RemoteError;

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} must be a whole number, got {value:?}")]
    NotANumber { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
    #[error("{key} is empty")]
    Empty { key: &'static str },
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Errors emitted by the attempt runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no submission is waiting for a retry")]
    NotSubmitting,
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
