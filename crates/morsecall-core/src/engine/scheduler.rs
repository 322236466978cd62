//! One-shot deferred execution for the alert auto-stop.
//!
//! A scheduled task is never cancelled here. Cancellation happens on the
//! engine side: the task carries the alert generation it was created for
//! and becomes a no-op once that generation is stale.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

pub trait TimerScheduler: Send + Sync {
    /// Run `task` once, roughly `delay` from now, on some other thread of control.
    fn schedule(&self, delay: Duration, task: TimerTask);
}

/// Spawns a sleeping task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime of the calling context, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

/// Fallback for hosts without a runtime: one short-lived thread per timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadScheduler;

impl TimerScheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) {
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            task();
        });
    }
}

/// Holds tasks until [`run_pending`](Self::run_pending) is called.
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<Vec<(Duration, TimerTask)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delays of the queued tasks, oldest first.
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(delay, _)| *delay)
            .collect()
    }

    /// Run every queued task as if its delay had elapsed. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        // Take the tasks out first: they call back into the engine, which
        // may schedule again.
        let tasks = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let count = tasks.len();
        for (_, task) in tasks {
            task();
        }
        count
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((delay, task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn manual_scheduler_runs_on_demand() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        scheduler.schedule(
            Duration::from_secs(5),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_secs(5)]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_waits_for_delay() {
        let scheduler = TokioScheduler::current().expect("inside runtime");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        scheduler.schedule(
            Duration::from_millis(5_000),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
