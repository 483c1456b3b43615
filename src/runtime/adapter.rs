use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use super::channel::Channel;
use crate::endpoint::{Connection, ConnectionErrorHandler, LoggingConnectionErrorHandler};
use crate::error::Result;
use crate::lifecycle::{Component, LifecycleCell, StateManagedComponent};

/// Top-level container of channels
///
/// Owns the connection error handler shared by every connection that does
/// not bring its own.
pub struct Adapter {
    unique_id: String,
    channels: RwLock<Vec<Arc<Channel>>>,
    connection_error_handler: Arc<dyn ConnectionErrorHandler>,
    lifecycle: LifecycleCell,
}

impl Adapter {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            channels: RwLock::new(Vec::new()),
            connection_error_handler: Arc::new(LoggingConnectionErrorHandler),
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn with_connection_error_handler(mut self, handler: Arc<dyn ConnectionErrorHandler>) -> Self {
        self.connection_error_handler = handler;
        self
    }

    pub fn with_channel(self, channel: Arc<Channel>) -> Self {
        self.add_channel(channel);
        self
    }

    pub fn add_channel(&self, channel: Arc<Channel>) {
        self.channels.write().push(channel);
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.channels.read().clone()
    }

    pub fn channel(&self, unique_id: &str) -> Option<Arc<Channel>> {
        self.channels
            .read()
            .iter()
            .find(|c| c.unique_id() == unique_id)
            .cloned()
    }

    pub fn connection_error_handler(&self) -> &Arc<dyn ConnectionErrorHandler> {
        &self.connection_error_handler
    }

    /// Report a failed connection to its own handler, or the shared one
    pub async fn report_connection_failure(&self, connection: &dyn Connection) {
        warn!(
            adapter_id = %self.unique_id,
            connection_id = %connection.component_id(),
            "⚠️ Connection failure reported"
        );
        let handler = connection
            .connection_error_handler()
            .unwrap_or_else(|| Arc::clone(&self.connection_error_handler));
        handler.handle_connection_exception(connection.component_id()).await;
    }
}

#[async_trait]
impl Component for Adapter {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn init(&self) -> Result<()> {
        for channel in self.channels() {
            channel.request_init().await?;
        }
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        for channel in self.channels() {
            channel.request_start().await?;
        }
        info!(adapter_id = %self.unique_id, "🚀 Adapter started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        for channel in self.channels().iter().rev() {
            channel.request_stop().await?;
        }
        info!(adapter_id = %self.unique_id, "🛑 Adapter stopped");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        for channel in self.channels().iter().rev() {
            channel.request_close().await?;
        }
        Ok(())
    }
}

crate::state_managed!(Adapter);
