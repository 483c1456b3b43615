//! # Management Bridge
//!
//! Lets an operator push a message into a running workflow and, optionally,
//! wait for the processed message to come back through the workflow's reply
//! cache.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::tree::{NodeId, RuntimeTree};
use crate::config::{ConfigurationError, ManagementConfig};
use crate::constants::defaults;
use crate::error::{Result, RuntimeError};
use crate::message::{SerializableMessage, SerializableMessageTranslator};
use crate::workflow::{StandardWorkflow, WorkflowOutcome};

/// Management entry point for one workflow
#[derive(Clone)]
pub struct ManagementBridge {
    workflow: Arc<StandardWorkflow>,
    reply_wait: Duration,
    reply_poll_interval: Duration,
}

impl std::fmt::Debug for ManagementBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementBridge")
            .field("workflow", &self.workflow.unique_id())
            .field("reply_wait", &self.reply_wait)
            .field("reply_poll_interval", &self.reply_poll_interval)
            .finish()
    }
}

impl ManagementBridge {
    pub fn new(workflow: Arc<StandardWorkflow>) -> Self {
        Self {
            workflow,
            reply_wait: defaults::MAX_REPLY_WAIT,
            reply_poll_interval: defaults::REPLY_POLL_INTERVAL,
        }
    }

    /// Bridge for the workflow at `node`
    pub fn for_node(tree: &RuntimeTree, node: NodeId) -> std::result::Result<Self, ConfigurationError> {
        tree.workflow(node).map(Self::new).ok_or_else(|| {
            ConfigurationError::invalid_value(
                "node",
                tree.identity(node).unwrap_or_else(|| format!("{node:?}")),
                "management bridge requires a workflow node",
            )
        })
    }

    pub fn with_config(mut self, config: &ManagementConfig) -> Self {
        self.reply_wait = config.reply_wait();
        self.reply_poll_interval = config.reply_poll_interval();
        self
    }

    pub fn with_reply_wait(mut self, reply_wait: Duration) -> Self {
        self.reply_wait = reply_wait;
        self
    }

    pub fn with_reply_poll_interval(mut self, interval: Duration) -> Self {
        self.reply_poll_interval = interval;
        self
    }

    pub fn workflow(&self) -> &Arc<StandardWorkflow> {
        &self.workflow
    }

    /// Deliver a message into the workflow
    pub async fn inject_message(&self, source: SerializableMessage) -> Result<WorkflowOutcome> {
        let msg = SerializableMessageTranslator::to_message(
            &source,
            self.workflow.message_factory().as_ref(),
        )?;
        info!(
            workflow_id = %self.workflow.unique_id(),
            message_id = %msg.unique_id(),
            "🔧 Injecting message"
        );
        Ok(self.workflow.on_message(msg).await?)
    }

    /// Deliver a message and wait for the processed result
    ///
    /// Returns `None` when no reply arrives within the configured wait.
    pub async fn inject_message_with_reply(
        &self,
        source: SerializableMessage,
    ) -> Result<Option<SerializableMessage>> {
        let message_id = source.unique_id.clone();
        let cache = self.workflow.reply_cache();
        cache.expect_reply(message_id.as_str());

        if let Err(err) = self.inject_message(source).await {
            cache.forget(&message_id);
            return Err(err);
        }

        let wait = async {
            loop {
                if let Some((reply, outcome)) = cache.take_reply(&message_id) {
                    debug!(message_id = %message_id, outcome = %outcome, "Reply received");
                    return SerializableMessageTranslator::from_message(&reply);
                }
                tokio::time::sleep(self.reply_poll_interval).await;
            }
        };

        match tokio::time::timeout(self.reply_wait, wait).await {
            Ok(reply) => Ok(Some(reply.map_err(RuntimeError::from)?)),
            Err(_) => {
                cache.forget(&message_id);
                warn!(
                    workflow_id = %self.workflow.unique_id(),
                    message_id = %message_id,
                    waited_ms = self.reply_wait.as_millis() as u64,
                    "⚠️ No reply within wait, giving up"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::CapturingProducer;
    use crate::error::WorkflowError;
    use crate::lifecycle::StateManagedComponent;
    use crate::service::{AddMetadataService, ServiceCollection};

    async fn started_workflow() -> (Arc<StandardWorkflow>, Arc<CapturingProducer>) {
        let producer = Arc::new(CapturingProducer::new("capture"));
        let services = ServiceCollection::sequential("chain")
            .with_service(Arc::new(AddMetadataService::new("enrich").with_metadata("seen", "yes")));
        let workflow = StandardWorkflow::builder("wf")
            .services(Arc::new(services))
            .producer(producer.clone())
            .build()
            .unwrap();
        workflow.request_init().await.unwrap();
        workflow.request_start().await.unwrap();
        (Arc::new(workflow), producer)
    }

    #[tokio::test]
    async fn test_inject_with_reply_returns_processed_message() {
        let (workflow, producer) = started_workflow().await;
        let bridge = ManagementBridge::new(workflow);

        let reply = bridge
            .inject_message_with_reply(SerializableMessage::new("m-1", "hello"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.unique_id, "m-1");
        assert_eq!(reply.content, "hello");
        assert_eq!(reply.metadata.get("seen").map(String::as_str), Some("yes"));
        assert_eq!(producer.produced_count(), 1);
        assert_eq!(bridge.workflow().reply_cache().pending(), 0);
    }

    #[tokio::test]
    async fn test_inject_into_stopped_workflow_fails() {
        let workflow = Arc::new(StandardWorkflow::builder("idle").build().unwrap());
        let bridge = ManagementBridge::new(workflow);
        let err = bridge
            .inject_message_with_reply(SerializableMessage::new("m-2", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Workflow(WorkflowError::NotStarted { .. })));
        assert_eq!(bridge.workflow().reply_cache().pending(), 0);
    }

    #[test]
    fn test_bridge_requires_workflow_node() {
        let mut tree = RuntimeTree::new();
        let adapter = tree.add_adapter(crate::runtime::Adapter::new("a")).unwrap();
        assert!(ManagementBridge::for_node(&tree, adapter).is_err());
    }
}
