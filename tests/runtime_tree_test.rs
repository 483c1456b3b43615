//! Adapter / channel / workflow hierarchy, retry strategy and management bridge

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use common::builders::*;
use integration_runtime::endpoint::{NullConnection, Producer};
use integration_runtime::error::{LifecycleError, ProduceResult, RuntimeError};
use integration_runtime::lifecycle::{Component, LifecycleCell, LifecycleState};
use integration_runtime::message::{Message, SerializableMessage};
use integration_runtime::runtime::{Adapter, Channel, ManagementBridge, RuntimeTree};
use integration_runtime::service::ServiceCollection;
use integration_runtime::state_managed;
use integration_runtime::workflow::{StandardWorkflow, WorkflowRetryAndContinue};

/// Producer that can never connect
struct UnreachableProducer {
    lifecycle: LifecycleCell,
}

#[async_trait]
impl Component for UnreachableProducer {
    fn component_id(&self) -> &str {
        "unreachable"
    }

    async fn init(&self) -> integration_runtime::Result<()> {
        Err(RuntimeError::Connection("connection refused".to_string()))
    }
}

state_managed!(UnreachableProducer);

#[async_trait]
impl Producer for UnreachableProducer {
    async fn produce(&self, _msg: &Message) -> ProduceResult<()> {
        Ok(())
    }
}

fn broken_workflow(id: &str) -> StandardWorkflow {
    StandardWorkflow::builder(id)
        .producer(Arc::new(UnreachableProducer {
            lifecycle: LifecycleCell::new(),
        }))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_workflow_start_under_closed_channel_fails() {
    let mut tree = RuntimeTree::new();
    let adapter = tree.add_adapter(Adapter::new("adapter")).unwrap();
    let channel = tree.add_channel(adapter, Channel::new("channel")).unwrap();
    let workflow = tree
        .add_workflow(channel, StandardWorkflow::builder("wf").build().unwrap())
        .unwrap();

    let err = tree.request_start(workflow).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Lifecycle(LifecycleError::ParentState { .. })
    ));
    assert_eq!(tree.state(workflow), Some(LifecycleState::Closed));

    let err = tree.request_init(channel).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Lifecycle(LifecycleError::ParentState { .. })
    ));
}

#[tokio::test]
async fn test_retry_strategy_skips_broken_workflow_and_starts_the_rest() {
    let mut tree = RuntimeTree::new();
    let adapter = tree.add_adapter(Adapter::new("adapter")).unwrap();
    let channel = tree
        .add_channel(
            adapter,
            Channel::new("channel")
                .with_consume_connection(Arc::new(NullConnection::new("in")))
                .with_lifecycle_strategy(Arc::new(WorkflowRetryAndContinue::new(2, Duration::ZERO))),
        )
        .unwrap();
    let broken = tree.add_workflow(channel, broken_workflow("broken")).unwrap();
    let healthy = tree
        .add_workflow(channel, StandardWorkflow::builder("healthy").build().unwrap())
        .unwrap();

    tree.request_init(adapter).await.unwrap();
    tree.request_start(adapter).await.unwrap();

    assert_eq!(tree.state(channel), Some(LifecycleState::Started));
    assert_eq!(tree.state(broken), Some(LifecycleState::Closed));
    assert_eq!(tree.state(healthy), Some(LifecycleState::Started));

    tree.request_close(adapter).await.unwrap();
    assert_eq!(tree.state(healthy), Some(LifecycleState::Closed));
}

#[tokio::test]
async fn test_management_bridge_round_trip_through_tree() -> anyhow::Result<()> {
    let log = call_log();
    let chain = ServiceCollection::sequential("chain")
        .with_service(RecordingService::new("enrich", &log).arc());

    let mut tree = RuntimeTree::new();
    let adapter = tree.add_adapter(Adapter::new("adapter"))?;
    let channel = tree.add_channel(adapter, Channel::new("channel"))?;
    let workflow = tree.add_workflow(
        channel,
        StandardWorkflow::builder("wf").services(Arc::new(chain)).build()?,
    )?;
    tree.request_init(adapter).await.context("init adapter")?;
    tree.request_start(adapter).await.context("start adapter")?;

    let path = tree.identity(workflow).context("workflow identity")?;
    assert_eq!(path, "adapter=adapter,channel=channel,workflow=wf");
    let node = tree.find(&path).context("lookup by identity")?;
    let bridge = ManagementBridge::for_node(&tree, node)?.with_reply_poll_interval(Duration::from_millis(5));

    let reply = bridge
        .inject_message_with_reply(SerializableMessage::new("injected-1", "body").with_metadata("k", "v"))
        .await?
        .context("reply expected")?;

    assert_eq!(reply.unique_id, "injected-1");
    assert_eq!(reply.metadata.get("k").map(String::as_str), Some("v"));
    assert_eq!(reply.metadata.get("visited.enrich").map(String::as_str), Some("true"));
    assert_eq!(*log.lock(), vec!["enrich"]);
    Ok(())
}
