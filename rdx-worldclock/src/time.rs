//! The tick source that drives clock re-rendering.
//!
//! A ticker is a scoped resource: [`TickScheduler::start`] hands back a
//! [`TickerGuard`], and dropping the guard stops the ticker. Changing the
//! cadence means dropping the old guard and starting a new one, so a stale
//! ticker can never keep running behind the engine's back.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

/// One beat of the ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickEvent {
    /// Counts from 1 for every ticker started.
    pub tick_count: u64,
    /// The instant every clock in this tick is rendered for.
    pub timestamp: DateTime<Utc>,
}

impl TickEvent {
    pub fn now(tick_count: u64) -> Self {
        Self {
            tick_count,
            timestamp: Utc::now(),
        }
    }
}

/// Emits a [`TickEvent`] every `interval` until its task is aborted.
pub struct SystemClock {
    interval: Duration,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
}

impl SystemClock {
    pub fn new(interval: Duration, tick_sender: broadcast::Sender<Arc<TickEvent>>) -> Self {
        Self {
            interval,
            tick_sender,
        }
    }

    /// The first tick fires immediately so a freshly attached view renders at once.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick_count = 0u64;
        loop {
            ticker.tick().await;
            tick_count += 1;
            trace!("SystemClock tick #{} ({:?}).", tick_count, self.interval);
            if self
                .tick_sender
                .send(Arc::new(TickEvent::now(tick_count)))
                .is_err()
            {
                trace!("Tick #{} had no receivers.", tick_count);
            }
        }
    }
}

/// Ownership of a running ticker. Dropping it stops the ticker.
#[derive(Debug)]
pub struct TickerGuard {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl TickerGuard {
    pub fn new(interval: Duration, task: JoinHandle<()>) -> Self {
        Self {
            interval,
            task: Some(task),
        }
    }

    /// A guard with no task behind it, for schedulers that don't spawn anything.
    pub fn detached(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Starts tickers on behalf of the engine.
pub trait TickScheduler: Send + Sync {
    fn start(&self, interval: Duration, ticks: broadcast::Sender<Arc<TickEvent>>) -> TickerGuard;
}

/// Runs each ticker as a tokio task. Must be called from inside a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TickScheduler for TokioScheduler {
    fn start(&self, interval: Duration, ticks: broadcast::Sender<Arc<TickEvent>>) -> TickerGuard {
        let clock = SystemClock::new(interval, ticks);
        TickerGuard::new(interval, tokio::spawn(clock.run()))
    }
}

/// A scheduler that only records the intervals it was asked for.
///
/// Lets callers assert cadence changes without waiting on real time.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    started: Mutex<Vec<Duration>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every interval passed to `start`, oldest first.
    pub fn started(&self) -> Vec<Duration> {
        self.started
            .lock()
            .map(|started| started.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Duration> {
        self.started().last().copied()
    }
}

impl TickScheduler for RecordingScheduler {
    fn start(&self, interval: Duration, _ticks: broadcast::Sender<Arc<TickEvent>>) -> TickerGuard {
        if let Ok(mut started) = self.started.lock() {
            started.push(interval);
        }
        TickerGuard::detached(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticker_fires_immediately_then_on_interval() {
        let (tx, mut rx) = broadcast::channel(16);
        let _guard = TokioScheduler.start(Duration::from_secs(1), tx);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.tick_count, 1);

        tokio::time::advance(Duration::from_millis(1000)).await;
        let second = rx.recv().await.unwrap();
        assert_eq!(second.tick_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_guard_stops_the_ticker() {
        let (tx, mut rx) = broadcast::channel(16);
        let guard = TokioScheduler.start(Duration::from_secs(60), tx.clone());
        assert_eq!(guard.interval(), Duration::from_secs(60));
        rx.recv().await.unwrap();

        drop(guard);
        tokio::time::advance(Duration::from_secs(600)).await;
        tokio::task::yield_now().await;

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn recording_scheduler_keeps_history() {
        let scheduler = RecordingScheduler::new();
        let (tx, _) = broadcast::channel(1);
        let a = scheduler.start(Duration::from_millis(1000), tx.clone());
        let b = scheduler.start(Duration::from_millis(60_000), tx);
        assert_eq!(a.interval(), Duration::from_millis(1000));
        assert_eq!(b.interval(), Duration::from_millis(60_000));
        assert_eq!(
            scheduler.started(),
            vec![Duration::from_millis(1000), Duration::from_millis(60_000)]
        );
        assert_eq!(scheduler.last(), Some(Duration::from_millis(60_000)));
    }
}
