use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::endpoint::Connection;
use crate::error::Result;
use crate::lifecycle::{Component, LifecycleCell};
use crate::workflow::{DefaultWorkflowLifecycleStrategy, StandardWorkflow, WorkflowLifecycleStrategy};

/// Workflows sharing a consume and a produce connection
///
/// Connections come up before the workflows and go down after them; the
/// lifecycle strategy decides how workflow failures are treated.
pub struct Channel {
    unique_id: String,
    consume_connection: Option<Arc<dyn Connection>>,
    produce_connection: Option<Arc<dyn Connection>>,
    workflows: RwLock<Vec<Arc<StandardWorkflow>>>,
    strategy: Arc<dyn WorkflowLifecycleStrategy>,
    lifecycle: LifecycleCell,
}

impl Channel {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            consume_connection: None,
            produce_connection: None,
            workflows: RwLock::new(Vec::new()),
            strategy: Arc::new(DefaultWorkflowLifecycleStrategy),
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn with_consume_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.consume_connection = Some(connection);
        self
    }

    pub fn with_produce_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.produce_connection = Some(connection);
        self
    }

    pub fn with_lifecycle_strategy(mut self, strategy: Arc<dyn WorkflowLifecycleStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_workflow(self, workflow: Arc<StandardWorkflow>) -> Self {
        self.add_workflow(workflow);
        self
    }

    pub fn add_workflow(&self, workflow: Arc<StandardWorkflow>) {
        self.workflows.write().push(workflow);
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn workflows(&self) -> Vec<Arc<StandardWorkflow>> {
        self.workflows.read().clone()
    }

    pub fn workflow(&self, unique_id: &str) -> Option<Arc<StandardWorkflow>> {
        self.workflows
            .read()
            .iter()
            .find(|w| w.unique_id() == unique_id)
            .cloned()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Arc<dyn Connection>> {
        self.consume_connection.iter().chain(self.produce_connection.iter())
    }
}

#[async_trait]
impl Component for Channel {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn init(&self) -> Result<()> {
        for connection in self.connections() {
            connection.request_init().await?;
        }
        self.strategy.init(&self.workflows()).await
    }

    async fn start(&self) -> Result<()> {
        for connection in self.connections() {
            connection.request_start().await?;
        }
        self.strategy.start(&self.workflows()).await?;
        info!(
            channel_id = %self.unique_id,
            count = self.workflows.read().len(),
            "🟢 Channel started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut workflows = self.workflows();
        workflows.reverse();
        self.strategy.stop(&workflows).await?;
        for connection in self.connections() {
            connection.request_stop().await?;
        }
        info!(channel_id = %self.unique_id, "🛑 Channel stopped");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut workflows = self.workflows();
        workflows.reverse();
        self.strategy.close(&workflows).await?;
        for connection in self.connections() {
            connection.request_close().await?;
        }
        Ok(())
    }
}

crate::state_managed!(Channel);
