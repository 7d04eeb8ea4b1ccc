mod events;
mod outcome;
mod progress;
mod service;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use events::{Direction, SessionEffect, SessionEvent};
pub use outcome::AttemptOutcome;
pub use progress::SessionProgress;
pub use service::{QuizSession, SessionPhase, SessionSettings};
pub use workflow::AttemptRunner;
