//! Exam countdown with a fire-once expiry latch.

/// Lifecycle of a `Countdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Running,
    Expired,
    Stopped,
}

/// Result of delivering one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second was consumed and time remains.
    Ticked { remaining: u32 },
    /// The clock reached zero on this tick. Reported exactly once.
    Expired,
    /// The countdown is not running; nothing changed.
    Ignored,
}

/// A per-second countdown, floored at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    duration: u32,
    remaining: u32,
    state: CountdownState,
}

impl Countdown {
    #[must_use]
    pub fn new(duration_seconds: u32) -> Self {
        Self {
            duration: duration_seconds,
            remaining: duration_seconds,
            state: CountdownState::Idle,
        }
    }

    /// Start ticking. Only an idle countdown can start.
    pub fn start(&mut self) -> bool {
        if self.state != CountdownState::Idle {
            return false;
        }
        self.state = CountdownState::Running;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.state != CountdownState::Running {
            return TickOutcome::Ignored;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = CountdownState::Expired;
            return TickOutcome::Expired;
        }
        TickOutcome::Ticked {
            remaining: self.remaining,
        }
    }

    /// Stop ticking for good. Remaining time is kept for reporting.
    pub fn stop(&mut self) {
        if matches!(self.state, CountdownState::Idle | CountdownState::Running) {
            self.state = CountdownState::Stopped;
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn state(&self) -> CountdownState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    /// Remaining time under a minute.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.remaining < 60
    }
}

/// Formats seconds as `m:ss`.
#[must_use]
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
