//! Bounded fire-and-forget background execution.
//!
//! Callers on a hot path (a teleport, a region shutting down) hand work to
//! the [`Dispatcher`] and return immediately. At most `workers` tasks make
//! progress at once; the rest wait for a permit without blocking the caller.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Notify, Semaphore};
use tracing::{debug, warn};

/// Shared bookkeeping for in-flight tasks.
#[derive(Debug)]
struct Inner {
    permits: Arc<Semaphore>,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Bounded worker pool for background tasks.
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Create a pool allowing `workers` concurrent tasks (minimum 1).
    pub fn new(workers: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                permits: Arc::new(Semaphore::new(workers.max(1))),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Run `task` in the background.
    ///
    /// Never blocks. Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match Arc::clone(&inner.permits).acquire_owned().await {
                Ok(_permit) => {
                    debug!(task = label, "background task started");
                    task.await;
                }
                Err(e) => warn!(task = label, error = %e, "worker pool closed, task dropped"),
            }
            if inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                inner.idle.notify_waiters();
            }
        });
    }

    /// Number of tasks queued or running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Wait until every spawned task has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn spawned_tasks_complete_before_idle() {
        let dispatcher = Dispatcher::new(2);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let done = Arc::clone(&done);
            dispatcher.spawn("count", async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        dispatcher.wait_idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 5);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_workers() {
        let dispatcher = Dispatcher::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            dispatcher.spawn("bounded", async move {
                let now = running.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        dispatcher.wait_idle().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_empty() {
        Dispatcher::default().wait_idle().await;
    }
}
