use async_trait::async_trait;
use std::sync::Arc;

use super::handler::ConnectionErrorHandler;
use crate::lifecycle::{Component, LifecycleCell, StateManagedComponent};

/// A managed connection to an external resource
pub trait Connection: StateManagedComponent {
    /// Handler used when this connection reports a failure; falls back to the
    /// owning adapter's handler when `None`
    fn connection_error_handler(&self) -> Option<Arc<dyn ConnectionErrorHandler>> {
        None
    }
}

/// Connection with no external resource behind it
pub struct NullConnection {
    unique_id: String,
    error_handler: Option<Arc<dyn ConnectionErrorHandler>>,
    lifecycle: LifecycleCell,
}

impl NullConnection {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            error_handler: None,
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ConnectionErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }
}

#[async_trait]
impl Component for NullConnection {
    fn component_id(&self) -> &str {
        &self.unique_id
    }
}

crate::state_managed!(NullConnection);

impl Connection for NullConnection {
    fn connection_error_handler(&self) -> Option<Arc<dyn ConnectionErrorHandler>> {
        self.error_handler.clone()
    }
}
