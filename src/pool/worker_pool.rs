//! # Worker Pool
//!
//! Bounded executor for pooled parallel work. At most `max_workers` submitted
//! futures run at once; the rest wait for a permit. Shutdown rejects new work,
//! waits (bounded) for everything already submitted, then aborts whatever is
//! still running.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::{PoolError, PoolResult};

/// Bounded-concurrency task executor
#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    max_workers: usize,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    running: Mutex<Vec<AbortHandle>>,
    shutdown_wait: Duration,
    closed: AtomicBool,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, max_workers: usize, shutdown_wait: Duration) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            name: name.into(),
            max_workers,
            permits: Arc::new(Semaphore::new(max_workers)),
            tracker: TaskTracker::new(),
            running: Mutex::new(Vec::new()),
            shutdown_wait,
            closed: AtomicBool::new(false),
        }
    }

    /// Submit work; it starts once a worker slot is free
    pub fn submit<F>(&self, work: F) -> PoolResult<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_shutdown() {
            return Err(PoolError::Closed);
        }

        let permits = Arc::clone(&self.permits);
        let handle = self.tracker.spawn(async move {
            // The semaphore is never closed, so acquire only fails if it is dropped
            let _permit = permits.acquire_owned().await.ok();
            work.await
        });

        let mut running = self.running.lock();
        running.retain(|h| !h.is_finished());
        running.push(handle.abort_handle());
        Ok(handle)
    }

    /// Stop accepting work and wait up to the shutdown wait for submitted work
    ///
    /// Returns `true` when everything finished in time; otherwise the remaining
    /// tasks are aborted and `false` is returned.
    pub async fn shutdown(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!(pool = %self.name, "Worker pool already shut down");
        }
        self.tracker.close();

        match tokio::time::timeout(self.shutdown_wait, self.tracker.wait()).await {
            Ok(()) => {
                info!(pool = %self.name, "🛑 Worker pool shut down cleanly");
                true
            }
            Err(_) => {
                let running = std::mem::take(&mut *self.running.lock());
                let aborted = running.iter().filter(|h| !h.is_finished()).count();
                for handle in running {
                    handle.abort();
                }
                warn!(
                    pool = %self.name,
                    aborted = aborted,
                    waited_ms = self.shutdown_wait.as_millis() as u64,
                    "⚠️ Worker pool did not drain in time, aborting remaining work"
                );
                false
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Workers currently running submitted work
    pub fn active_workers(&self) -> usize {
        self.max_workers - self.permits.available_permits()
    }

    /// Submitted tasks not yet finished, running or waiting
    pub fn pending_tasks(&self) -> usize {
        self.tracker.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new("bounded", 2, Duration::from_secs(5));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(
                pool.submit(async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                })
                .unwrap(),
            );
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let pool = WorkerPool::new("closing", 1, Duration::from_secs(1));
        assert!(pool.shutdown().await);
        assert_eq!(pool.submit(async {}).err(), Some(PoolError::Closed));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_after_timeout() {
        let pool = WorkerPool::new("stuck", 1, Duration::from_millis(20));
        let handle = pool
            .submit(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
            .unwrap();
        assert!(!pool.shutdown().await);
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
