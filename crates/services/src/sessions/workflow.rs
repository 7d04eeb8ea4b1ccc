use remote::Backend;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::Clock;
use crate::config::QuizConfig;
use crate::error::SessionError;
use super::events::{SessionEffect, SessionEvent};
use super::outcome::AttemptOutcome;
use super::service::{QuizSession, SessionPhase};
use super::timer::{TICK_PERIOD, TickTimer};

/// Drives a `QuizSession` against a backend.
///
/// Effects are executed as spawned tasks whose completions come back through the
/// runner's event queue, so the session itself is only ever touched from `dispatch`.
pub struct AttemptRunner {
    session: QuizSession,
    backend: Backend,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
    timer: TickTimer,
}

impl AttemptRunner {
    #[must_use]
    pub fn new(session: QuizSession, backend: Backend) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session,
            backend,
            events_tx,
            events_rx,
            timer: TickTimer::new(TICK_PERIOD),
        }
    }

    /// Build a runner talking to the HTTP catalog service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Remote` if the base URL is unusable.
    pub fn connect(config: &QuizConfig, clock: Clock) -> Result<Self, SessionError> {
        let backend = Backend::http(&config.api_base_url)?;
        let session = QuizSession::new(config.session_settings(), clock);
        Ok(Self::new(session, backend))
    }

    /// Kick off the first catalog load. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        let effects = self.session.start();
        self.execute(effects);
    }

    /// Feed one event to the session and carry out whatever it asks for.
    pub fn dispatch(&mut self, event: SessionEvent) {
        let effects = self.session.handle(event);
        self.execute(effects);
    }

    /// Wait for the next completion or tick and apply it.
    ///
    /// The runner keeps a sender of its own queue, so this only returns once something
    /// arrives. With no fetch, submission or timer outstanding it waits forever.
    pub async fn step(&mut self) -> SessionPhase {
        if let Some(event) = self.events_rx.recv().await {
            self.dispatch(event);
        }
        self.session.phase()
    }

    /// Step until `done` holds for the session.
    ///
    /// Never returns if `done` cannot become true, for example waiting for answers on a
    /// lesson without questions. Wrap the call in `tokio::time::timeout` when the
    /// condition may be unreachable.
    pub async fn run_until(&mut self, mut done: impl FnMut(&QuizSession) -> bool) {
        while !done(&self.session) {
            self.step().await;
        }
    }

    /// Re-send the frozen record after a failed submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` outside the `Submitting` phase and
    /// `SessionError::SubmissionInFlight` while a previous send is still pending.
    pub fn retry_submission(&mut self) -> Result<(), SessionError> {
        if self.session.phase() != SessionPhase::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        if self.session.submission_in_flight() {
            return Err(SessionError::SubmissionInFlight);
        }
        self.dispatch(SessionEvent::RetrySubmission);
        Ok(())
    }

    /// Re-issue the load for whatever level is currently showing, after a failed fetch.
    pub fn reload(&mut self) {
        let effects = self.session.reload();
        self.execute(effects);
    }

    /// Leave the session; pending work is discarded and the timer stops.
    pub fn abandon(&mut self) {
        self.dispatch(SessionEvent::Abandoned);
    }

    /// The result of a terminated attempt.
    #[must_use]
    pub fn outcome(&self) -> Option<AttemptOutcome> {
        if self.session.phase() != SessionPhase::Terminated {
            return None;
        }
        let record = self.session.submission()?;
        let attempt_id = self.session.attempt_id()?;
        let certificate_url = if record.passed {
            self.backend.attempts.certificate_url(attempt_id)
        } else {
            None
        };
        Some(AttemptOutcome {
            attempt_id,
            headline: record.message.clone(),
            passed: record.passed,
            score: record.score,
            tally: record.tally,
            total_questions: record.context.total_questions,
            minutes_taken: record.minutes_taken(),
            submitted_at: record.submitted_at,
            certificate_url,
        })
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    fn execute(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::Fetch(request) => {
                    let catalog = self.backend.catalog.clone();
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let response = request.execute(catalog.as_ref()).await;
                        // Receiver gone means the runner was dropped.
                        let _ = events.send(SessionEvent::Loaded(response));
                    });
                }
                SessionEffect::Submit(record) => {
                    let attempts = self.backend.attempts.clone();
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let event = match attempts.submit_attempt(&record).await {
                            Ok(id) => SessionEvent::SubmissionSucceeded(id),
                            Err(err) => SessionEvent::SubmissionFailed(err),
                        };
                        let _ = events.send(event);
                    });
                }
                SessionEffect::StartTimer => self.timer.start(self.events_tx.clone()),
                SessionEffect::StopTimer => self.timer.stop(),
            }
        }
    }
}

impl std::fmt::Debug for AttemptRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptRunner")
            .field("session", &self.session)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}
