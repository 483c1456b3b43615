//! # Fixed Interval Poller
//!
//! Drives a [`PollingConsumer`] from a dedicated tokio task. After an initial
//! delay the task polls, then sleeps a fixed interval measured from the end of
//! one poll to the start of the next. Polls never overlap; a poll that cannot
//! take the consumer's lock is skipped, not queued.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::PollerConfig;
use crate::constants::defaults;
use crate::endpoint::PollingConsumer;
use crate::error::Result;
use crate::lifecycle::{Component, LifecycleCell};

/// Result of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The consumer's lock was held elsewhere
    Skipped,
    Processed { count: usize },
    /// `process_messages` failed or panicked
    Failed,
}

/// Counters kept across polls
#[derive(Debug, Default)]
pub struct PollerStats {
    polls: AtomicU64,
    skipped: AtomicU64,
    messages: AtomicU64,
    failures: AtomicU64,
}

impl PollerStats {
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Releases the consumer's lock however the poll ends
struct LockRelease<'a>(&'a dyn PollingConsumer);

impl Drop for LockRelease<'_> {
    fn drop(&mut self) {
        self.0.release_lock();
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Run one poll against `consumer`
///
/// Errors and panics from `process_messages` are logged and handed to the
/// consumer's connection exception handler; they never escape.
pub async fn poll_once(consumer: &dyn PollingConsumer, stats: &PollerStats) -> PollOutcome {
    stats.polls.fetch_add(1, Ordering::Relaxed);
    if !consumer.attempt_lock() {
        trace!(consumer_id = %consumer.consumer_id(), "Could not acquire consumer lock, skipping poll");
        stats.skipped.fetch_add(1, Ordering::Relaxed);
        return PollOutcome::Skipped;
    }
    let _release = LockRelease(consumer);

    let started = Instant::now();
    let result = AssertUnwindSafe(consumer.process_messages()).catch_unwind().await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(count)) => {
            debug!(
                consumer_id = %consumer.consumer_id(),
                count = count,
                duration_ms = duration_ms,
                "Processed messages"
            );
            stats.messages.fetch_add(count as u64, Ordering::Relaxed);
            PollOutcome::Processed { count }
        }
        Ok(Err(err)) => {
            error!(
                consumer_id = %consumer.consumer_id(),
                error = %err,
                duration_ms = duration_ms,
                "🔴 Exception while polling"
            );
            stats.failures.fetch_add(1, Ordering::Relaxed);
            consumer.handle_connection_exception().await;
            PollOutcome::Failed
        }
        Err(panic) => {
            error!(
                consumer_id = %consumer.consumer_id(),
                panic_msg = %panic_message(panic.as_ref()),
                duration_ms = duration_ms,
                "🔴 Consumer panicked while polling"
            );
            stats.failures.fetch_add(1, Ordering::Relaxed);
            consumer.handle_connection_exception().await;
            PollOutcome::Failed
        }
    }
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls a consumer at a fixed delay
pub struct FixedIntervalPoller {
    unique_id: String,
    consumer: Arc<dyn PollingConsumer>,
    interval: Duration,
    initial_delay: Duration,
    shutdown_wait: Duration,
    stats: Arc<PollerStats>,
    task: Mutex<Option<PollTask>>,
    lifecycle: LifecycleCell,
}

impl FixedIntervalPoller {
    pub fn new(unique_id: impl Into<String>, consumer: Arc<dyn PollingConsumer>) -> Self {
        Self {
            unique_id: unique_id.into(),
            consumer,
            interval: defaults::POLL_INTERVAL,
            initial_delay: defaults::POLL_INITIAL_DELAY,
            shutdown_wait: defaults::SHUTDOWN_WAIT,
            stats: Arc::new(PollerStats::default()),
            task: Mutex::new(None),
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn with_config(mut self, config: &PollerConfig) -> Self {
        self.interval = config.interval();
        self.initial_delay = config.initial_delay();
        self.shutdown_wait = config.shutdown_wait();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_shutdown_wait(mut self, wait: Duration) -> Self {
        self.shutdown_wait = wait;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> &PollerStats {
        &self.stats
    }

    /// Poll once on the caller's task, outside the schedule
    pub async fn poll_once(&self) -> PollOutcome {
        poll_once(self.consumer.as_ref(), &self.stats).await
    }

    pub async fn is_scheduled(&self) -> bool {
        self.task.lock().await.is_some()
    }

    async fn cancel_schedule(&self) {
        let Some(mut task) = self.task.lock().await.take() else {
            return;
        };
        task.cancel.cancel();
        match tokio::time::timeout(self.shutdown_wait, &mut task.handle).await {
            Ok(_) => debug!(poller = %self.unique_id, "Poll task finished"),
            Err(_) => {
                warn!(
                    poller = %self.unique_id,
                    waited_ms = self.shutdown_wait.as_millis() as u64,
                    "⚠️ Poll task did not finish in time, aborting"
                );
                task.handle.abort();
            }
        }
    }
}

#[async_trait]
impl Component for FixedIntervalPoller {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let consumer = Arc::clone(&self.consumer);
        let stats = Arc::clone(&self.stats);
        let (initial_delay, interval) = (self.initial_delay, self.interval);
        let poller_id = self.unique_id.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(initial_delay) => {}
            }
            loop {
                // A poll in progress is never interrupted by cancellation
                poll_once(consumer.as_ref(), &stats).await;
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!(poller = %poller_id, "Poll schedule cancelled");
        });

        *task = Some(PollTask { cancel, handle });
        info!(
            poller = %self.unique_id,
            consumer_id = %self.consumer.consumer_id(),
            interval_ms = self.interval.as_millis() as u64,
            "🟢 Poller started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.cancel_schedule().await;
        info!(poller = %self.unique_id, "🛑 Poller stopped");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.cancel_schedule().await;
        Ok(())
    }
}

crate::state_managed!(FixedIntervalPoller);
