use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{error, warn};

use crate::error::RuntimeError;
use crate::message::Message;

/// Handles a message whose processing or production failed
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle_processing_exception(&self, msg: &Message, error: &RuntimeError);
}

/// Handles loss of an external connection
#[async_trait]
pub trait ConnectionErrorHandler: Send + Sync {
    async fn handle_connection_exception(&self, component_id: &str);
}

/// Logs failed messages and drops them
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorHandler;

#[async_trait]
impl ErrorHandler for LoggingErrorHandler {
    async fn handle_processing_exception(&self, msg: &Message, err: &RuntimeError) {
        error!(
            message_id = %msg.unique_id(),
            error = %err,
            "🔴 Message processing failed"
        );
    }
}

/// Logs connection failures without acting on them
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingConnectionErrorHandler;

#[async_trait]
impl ConnectionErrorHandler for LoggingConnectionErrorHandler {
    async fn handle_connection_exception(&self, component_id: &str) {
        warn!(component_id = %component_id, "⚠️ Connection exception reported");
    }
}

/// Keeps every failed message with the error text
#[derive(Debug, Default)]
pub struct CapturingErrorHandler {
    failed: Mutex<Vec<(Message, String)>>,
}

impl CapturingErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(&self) -> Vec<(Message, String)> {
        self.failed.lock().clone()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.lock().len()
    }
}

#[async_trait]
impl ErrorHandler for CapturingErrorHandler {
    async fn handle_processing_exception(&self, msg: &Message, err: &RuntimeError) {
        self.failed.lock().push((msg.clone(), err.to_string()));
    }
}
