//! # Workflow Interceptors
//!
//! Observers notified at the start and end of every message a workflow
//! processes. The end notification always fires, whatever the outcome.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use crate::config::MetricsConfig;
use crate::constants::{defaults, objects::COMPLETION_MONITOR};
use crate::message::Message;

/// How a workflow finished with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowOutcome {
    Produced,
    /// Stop-processing was set; the producer was skipped
    Skipped,
    /// Service chain or producer failed; the error handler was invoked
    Failed,
}

impl WorkflowOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Produced => write!(f, "produced"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Observer of a workflow's message processing
pub trait WorkflowInterceptor: Send + Sync {
    fn name(&self) -> &str;

    fn workflow_start(&self, _msg: &mut Message) {}

    fn workflow_end(&self, _msg: &Message, _outcome: WorkflowOutcome) {}
}

/// Counters for one time slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetricsSlice {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub message_count: u64,
    pub error_count: u64,
    pub total_bytes: u64,
}

impl MessageMetricsSlice {
    fn new(start: DateTime<Utc>, width: ChronoDuration) -> Self {
        Self {
            start,
            end: start + width,
            message_count: 0,
            error_count: 0,
            total_bytes: 0,
        }
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Time-sliced counts of messages, errors and payload bytes
///
/// Slices are aligned to multiples of the slice duration; only the most recent
/// `max_slices` are kept.
pub struct MessageMetricsInterceptor {
    name: String,
    slice_duration: ChronoDuration,
    max_slices: usize,
    slices: Mutex<VecDeque<MessageMetricsSlice>>,
}

impl MessageMetricsInterceptor {
    pub fn new(name: impl Into<String>, slice_duration: Duration, max_slices: usize) -> Self {
        let slice_duration = ChronoDuration::from_std(slice_duration)
            .ok()
            .filter(|width| *width > ChronoDuration::zero())
            .unwrap_or_else(|| ChronoDuration::seconds(defaults::METRICS_SLICE_DURATION.as_secs() as i64));
        Self {
            name: name.into(),
            slice_duration,
            max_slices: max_slices.max(1),
            slices: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &MetricsConfig) -> Self {
        Self::new(name, config.slice_duration(), config.max_slices)
    }

    /// Record one finished message at `at`
    pub fn record_at(&self, at: DateTime<Utc>, size: usize, failed: bool) {
        let mut slices = self.slices.lock();
        let needs_slice = slices.back().map_or(true, |slice| !slice.contains(at));
        if needs_slice {
            let width_ms = self.slice_duration.num_milliseconds().max(1);
            let aligned_ms = at.timestamp_millis() - at.timestamp_millis().rem_euclid(width_ms);
            let start = Utc.timestamp_millis_opt(aligned_ms).single().unwrap_or(at);
            slices.push_back(MessageMetricsSlice::new(start, self.slice_duration));
            while slices.len() > self.max_slices {
                slices.pop_front();
            }
        }
        if let Some(slice) = slices.back_mut() {
            slice.message_count += 1;
            slice.total_bytes += size as u64;
            if failed {
                slice.error_count += 1;
            }
        }
    }

    pub fn slices(&self) -> Vec<MessageMetricsSlice> {
        self.slices.lock().iter().cloned().collect()
    }

    pub fn total_messages(&self) -> u64 {
        self.slices.lock().iter().map(|s| s.message_count).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.slices.lock().iter().map(|s| s.error_count).sum()
    }
}

impl WorkflowInterceptor for MessageMetricsInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn workflow_end(&self, msg: &Message, outcome: WorkflowOutcome) {
        self.record_at(Utc::now(), msg.size(), outcome.is_failure());
    }
}

/// Number of messages currently inside the workflow
#[derive(Debug, Default)]
pub struct InFlightInterceptor {
    in_flight: AtomicUsize,
    completed: AtomicU64,
}

impl InFlightInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl WorkflowInterceptor for InFlightInterceptor {
    fn name(&self) -> &str {
        "in-flight"
    }

    fn workflow_start(&self, _msg: &mut Message) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    fn workflow_end(&self, _msg: &Message, _outcome: WorkflowOutcome) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Keeps the final form of messages whose reply somebody is waiting for
#[derive(Debug, Default)]
pub struct ReplyCacheInterceptor {
    expected: DashMap<String, ()>,
    replies: DashMap<String, (Message, WorkflowOutcome)>,
}

impl ReplyCacheInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the reply for `message_id` when its processing ends
    pub fn expect_reply(&self, message_id: impl Into<String>) {
        self.expected.insert(message_id.into(), ());
    }

    /// Stop waiting for a reply, discarding anything cached
    pub fn forget(&self, message_id: &str) {
        self.expected.remove(message_id);
        self.replies.remove(message_id);
    }

    pub fn take_reply(&self, message_id: &str) -> Option<(Message, WorkflowOutcome)> {
        self.replies.remove(message_id).map(|(_, reply)| reply)
    }

    pub fn pending(&self) -> usize {
        self.expected.len()
    }
}

impl WorkflowInterceptor for ReplyCacheInterceptor {
    fn name(&self) -> &str {
        "reply-cache"
    }

    fn workflow_end(&self, msg: &Message, outcome: WorkflowOutcome) {
        if self.expected.remove(msg.unique_id()).is_some() {
            debug!(message_id = %msg.unique_id(), outcome = %outcome, "Caching reply");
            self.replies
                .insert(msg.unique_id().to_string(), (msg.clone(), outcome));
        }
    }
}

/// Completion signal carried as an object attachment
///
/// A request/reply consumer attaches one before handing the message over and
/// waits on it; the workflow completes it when processing ends.
#[derive(Debug, Default)]
pub struct CompletionMonitor {
    completed: AtomicBool,
    outcome: Mutex<Option<WorkflowOutcome>>,
    notify: Notify,
}

impl CompletionMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a new monitor to `msg` and return it
    pub fn attach(msg: &mut Message) -> Arc<Self> {
        let monitor = Self::new();
        msg.add_object(COMPLETION_MONITOR, monitor.clone());
        monitor
    }

    pub fn find(msg: &Message) -> Option<Arc<Self>> {
        msg.object_as::<Self>(COMPLETION_MONITOR)
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn outcome(&self) -> Option<WorkflowOutcome> {
        *self.outcome.lock()
    }

    fn complete(&self, outcome: WorkflowOutcome) {
        *self.outcome.lock() = Some(outcome);
        self.completed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Wait until the message has finished, or until `timeout` expires
    pub async fn wait_for_completion(&self, timeout: Duration) -> Option<WorkflowOutcome> {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.is_complete() {
                    return self.outcome();
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }
}

/// Completes the message's [`CompletionMonitor`], attaching one first when the
/// consumer did not
///
/// A message entering the workflow while its monitor is still pending is a
/// re-entrant delivery; the nested pass does not complete the outer monitor.
#[derive(Debug, Default)]
pub struct CompletionMonitorInterceptor {
    active: DashMap<String, usize>,
}

impl CompletionMonitorInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.active.len()
    }
}

impl WorkflowInterceptor for CompletionMonitorInterceptor {
    fn name(&self) -> &str {
        "completion-monitor"
    }

    fn workflow_start(&self, msg: &mut Message) {
        if CompletionMonitor::find(msg).is_none() {
            CompletionMonitor::attach(msg);
        }
        *self.active.entry(msg.unique_id().to_string()).or_insert(0) += 1;
    }

    fn workflow_end(&self, msg: &Message, outcome: WorkflowOutcome) {
        let outermost = match self.active.get_mut(msg.unique_id()) {
            Some(mut depth) => {
                *depth -= 1;
                *depth == 0
            }
            None => true,
        };
        if !outermost {
            return;
        }
        self.active.remove(msg.unique_id());
        if let Some(monitor) = CompletionMonitor::find(msg) {
            monitor.complete(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DefaultMessageFactory, MessageFactory};

    fn message() -> Message {
        DefaultMessageFactory::new().new_message(b"12345".to_vec())
    }

    #[test]
    fn test_metrics_slices_roll_and_are_bounded() {
        let metrics = MessageMetricsInterceptor::new("metrics", Duration::from_secs(60), 2);
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        metrics.record_at(base, 10, false);
        metrics.record_at(base + ChronoDuration::seconds(30), 5, true);
        metrics.record_at(base + ChronoDuration::seconds(61), 1, false);
        metrics.record_at(base + ChronoDuration::seconds(125), 1, false);

        let slices = metrics.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].start, base + ChronoDuration::seconds(60));
        assert_eq!(metrics.total_messages(), 2);

        let fresh = MessageMetricsInterceptor::new("metrics", Duration::from_secs(60), 12);
        fresh.record_at(base, 10, false);
        fresh.record_at(base + ChronoDuration::seconds(30), 5, true);
        let slice = &fresh.slices()[0];
        assert_eq!(slice.message_count, 2);
        assert_eq!(slice.error_count, 1);
        assert_eq!(slice.total_bytes, 15);
    }

    #[test]
    fn test_in_flight_counts() {
        let interceptor = InFlightInterceptor::new();
        let mut msg = message();
        interceptor.workflow_start(&mut msg);
        assert!(interceptor.is_in_flight());
        interceptor.workflow_end(&msg, WorkflowOutcome::Produced);
        assert_eq!(interceptor.in_flight(), 0);
        assert_eq!(interceptor.completed(), 1);
    }

    #[test]
    fn test_reply_cache_only_keeps_expected_messages() {
        let cache = ReplyCacheInterceptor::new();
        let expected = message();
        let other = message();
        cache.expect_reply(expected.unique_id());

        cache.workflow_end(&other, WorkflowOutcome::Produced);
        cache.workflow_end(&expected, WorkflowOutcome::Skipped);

        assert!(cache.take_reply(other.unique_id()).is_none());
        let (reply, outcome) = cache.take_reply(expected.unique_id()).unwrap();
        assert_eq!(reply.unique_id(), expected.unique_id());
        assert_eq!(outcome, WorkflowOutcome::Skipped);
        assert_eq!(cache.pending(), 0);
    }

    #[tokio::test]
    async fn test_completion_monitor_signals_waiter() {
        let interceptor = CompletionMonitorInterceptor::new();
        let mut msg = message();
        let monitor = CompletionMonitor::attach(&mut msg);

        interceptor.workflow_start(&mut msg);
        assert!(!monitor.is_complete());

        let waiter = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.wait_for_completion(Duration::from_secs(5)).await })
        };
        interceptor.workflow_end(&msg, WorkflowOutcome::Produced);

        assert_eq!(waiter.await.unwrap(), Some(WorkflowOutcome::Produced));
        assert_eq!(interceptor.active(), 0);
    }

    #[test]
    fn test_nested_pass_does_not_complete_outer_monitor() {
        let interceptor = CompletionMonitorInterceptor::new();
        let mut msg = message();
        interceptor.workflow_start(&mut msg);
        interceptor.workflow_start(&mut msg);
        interceptor.workflow_end(&msg, WorkflowOutcome::Produced);

        let monitor = CompletionMonitor::find(&msg).unwrap();
        assert!(!monitor.is_complete());
        interceptor.workflow_end(&msg, WorkflowOutcome::Produced);
        assert!(monitor.is_complete());
    }
}
