#![forbid(unsafe_code)]

pub mod answer_cache;
pub mod catalog_loader;
pub mod config;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;

pub use answer_cache::AnswerCache;
pub use catalog_loader::{
    CatalogLoader, CatalogRequest, CatalogResponse, FetchTicket, LoadOutcome, Selection,
};
pub use config::QuizConfig;
pub use error::{ConfigError, SessionError};

pub use sessions::{
    AttemptOutcome, AttemptRunner, Direction, QuizSession, SessionEffect, SessionEvent,
    SessionPhase, SessionProgress, SessionSettings,
};
