use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::events::SessionEvent;

pub(crate) const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background task that feeds `SessionEvent::Tick` into a runner once per period.
///
/// The first tick fires one full period after `start`. Stopping (or dropping) the timer
/// aborts the task, so no tick is delivered after the attempt ends.
#[derive(Debug)]
pub(crate) struct TickTimer {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl TickTimer {
    pub(crate) fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    /// Start ticking into `events`. A running timer is left alone.
    pub(crate) fn start(&mut self, events: UnboundedSender<SessionEvent>) {
        if self.is_running() {
            return;
        }
        let period = self.period;
        let first = Instant::now() + period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if events.send(SessionEvent::Tick).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(?period, "countdown timer started");
    }

    pub(crate) fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("countdown timer stopped");
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TickTimer::new(TICK_PERIOD);
        timer.start(tx);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert!(matches!(rx.recv().await, Some(SessionEvent::Tick)));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TickTimer::new(TICK_PERIOD);
        timer.start(tx);
        timer.stop();

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;

        assert!(!timer.is_running());
        assert!(rx.try_recv().is_err());
    }
}
