use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::endpoint::{ConnectionErrorHandler, ConsumerLock, MessageListener, PollingConsumer};
use crate::error::Result;
use crate::message::{DefaultMessageFactory, Message, MessageFactory};

/// Content and metadata stamped on every triggered message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTemplate {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl MessageTemplate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Polling consumer that fabricates one message per poll and delivers it
///
/// Without a template the message is empty.
pub struct PollingTrigger {
    unique_id: String,
    listener: Arc<dyn MessageListener>,
    factory: Arc<dyn MessageFactory>,
    template: Option<MessageTemplate>,
    connection_error_handler: Option<Arc<dyn ConnectionErrorHandler>>,
    lock: ConsumerLock,
}

impl PollingTrigger {
    pub fn new(unique_id: impl Into<String>, listener: Arc<dyn MessageListener>) -> Self {
        Self {
            unique_id: unique_id.into(),
            listener,
            factory: Arc::new(DefaultMessageFactory::new()),
            template: None,
            connection_error_handler: None,
            lock: ConsumerLock::new(),
        }
    }

    pub fn with_template(mut self, template: MessageTemplate) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_connection_error_handler(mut self, handler: Arc<dyn ConnectionErrorHandler>) -> Self {
        self.connection_error_handler = Some(handler);
        self
    }

    fn create_message(&self) -> Result<Message> {
        match &self.template {
            None => Ok(self.factory.new_empty_message()),
            Some(template) => {
                let mut msg = self.factory.new_string_message(&template.content)?;
                for (key, value) in &template.metadata {
                    msg.add_metadata(key.as_str(), value.as_str());
                }
                Ok(msg)
            }
        }
    }
}

#[async_trait]
impl PollingConsumer for PollingTrigger {
    fn consumer_id(&self) -> &str {
        &self.unique_id
    }

    fn attempt_lock(&self) -> bool {
        self.lock.try_lock()
    }

    fn release_lock(&self) {
        self.lock.release();
    }

    async fn process_messages(&self) -> Result<usize> {
        let msg = self.create_message()?;
        debug!(trigger = %self.unique_id, message_id = %msg.unique_id(), "Triggering message");
        self.listener.on_message(msg).await?;
        Ok(1)
    }

    async fn handle_connection_exception(&self) {
        if let Some(handler) = &self.connection_error_handler {
            handler.handle_connection_exception(&self.unique_id).await;
        }
    }
}
