//! Scheduled polling driving a workflow

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::builders::*;
use integration_runtime::lifecycle::{LifecycleState, StateManagedComponent};
use integration_runtime::poller::{FixedIntervalPoller, MessageTemplate, PollOutcome, PollingTrigger};
use integration_runtime::service::ServiceCollection;

#[tokio::test]
async fn test_held_lock_skips_processing() {
    let consumer = Arc::new(ScriptedConsumer::default());
    assert!(consumer.lock.try_lock());
    let poller = FixedIntervalPoller::new("poller", consumer.clone());

    assert_eq!(poller.poll_once().await, PollOutcome::Skipped);
    assert_eq!(consumer.process_calls.load(Ordering::SeqCst), 0);
    assert_eq!(poller.stats().skipped(), 1);

    consumer.lock.release();
    assert_eq!(poller.poll_once().await, PollOutcome::Processed { count: 1 });
    assert!(!consumer.lock.is_locked());
}

#[tokio::test]
async fn test_failed_poll_reports_connection_exception_and_releases_lock() {
    let consumer = Arc::new(ScriptedConsumer::default());
    consumer.fail.store(true, Ordering::SeqCst);
    let poller = FixedIntervalPoller::new("poller", consumer.clone());

    assert_eq!(poller.poll_once().await, PollOutcome::Failed);
    assert_eq!(consumer.connection_exceptions.load(Ordering::SeqCst), 1);
    assert!(!consumer.lock.is_locked());

    consumer.fail.store(false, Ordering::SeqCst);
    consumer.panic.store(true, Ordering::SeqCst);
    assert_eq!(poller.poll_once().await, PollOutcome::Failed);
    assert_eq!(consumer.connection_exceptions.load(Ordering::SeqCst), 2);
    assert!(!consumer.lock.is_locked());
    assert_eq!(poller.stats().failures(), 2);
}

#[tokio::test]
async fn test_trigger_drives_workflow_on_schedule() {
    let log = call_log();
    let chain = ServiceCollection::sequential("chain")
        .with_service(RecordingService::new("step", &log).arc());
    let harness = WorkflowHarness::started("wf", chain).await;

    let trigger = Arc::new(
        PollingTrigger::new("trigger", harness.workflow.clone())
            .with_template(MessageTemplate::new("tick").with_metadata("source", "schedule")),
    );
    let poller = FixedIntervalPoller::new("poller", trigger)
        .with_initial_delay(Duration::ZERO)
        .with_interval(Duration::from_millis(10))
        .with_shutdown_wait(Duration::from_secs(1));

    poller.request_init().await.unwrap();
    poller.request_start().await.unwrap();
    assert!(poller.is_scheduled().await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    poller.request_stop().await.unwrap();
    assert!(!poller.is_scheduled().await);
    assert_eq!(poller.state(), LifecycleState::Stopped);

    let produced = harness.producer.produced_count();
    assert!(produced >= 2, "expected repeated polls, got {produced}");
    assert_eq!(poller.stats().messages(), produced as u64);
    assert_eq!(harness.producer.produced()[0].metadata_value("source"), Some("schedule"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.producer.produced_count(), produced);
}
