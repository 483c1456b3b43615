use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::factory::MessageFactory;
use super::message::Message;
use crate::error::ServiceResult;

/// Transport-neutral form of a message used for management injection
///
/// Object attachments and the lifecycle trace are process-local and are not
/// carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableMessage {
    pub unique_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_service_id: Option<String>,
}

impl SerializableMessage {
    pub fn new(unique_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Converts between [`SerializableMessage`] and [`Message`]
pub struct SerializableMessageTranslator;

impl SerializableMessageTranslator {
    /// Build a runtime message, keeping the serialized unique id
    pub fn to_message(
        source: &SerializableMessage,
        factory: &dyn MessageFactory,
    ) -> ServiceResult<Message> {
        let mut msg = Message::with_id(source.unique_id.as_str());
        for (key, value) in &source.metadata {
            msg.add_metadata(key.as_str(), value.as_str());
        }
        let encoding = source
            .content_encoding
            .as_deref()
            .or_else(|| factory.default_encoding());
        msg.set_content(&source.content, encoding)?;
        if let Some(next) = &source.next_service_id {
            msg.set_next_service_id(next.as_str());
        }
        Ok(msg)
    }

    pub fn from_message(source: &Message) -> ServiceResult<SerializableMessage> {
        Ok(SerializableMessage {
            unique_id: source.unique_id().to_string(),
            content: source.content()?,
            content_encoding: source.content_encoding().map(str::to_string),
            metadata: source
                .metadata()
                .iter()
                .map(|e| (e.key.clone(), e.value.clone()))
                .collect(),
            next_service_id: source.next_service_id().map(str::to_string),
        })
    }
}
