use uuid::Uuid;

use super::message::Message;
use crate::error::ServiceResult;

/// Creates messages for an endpoint or workflow
pub trait MessageFactory: Send + Sync {
    /// Encoding applied to messages created without an explicit one
    fn default_encoding(&self) -> Option<&str>;

    /// Generate the unique identifier for a new message
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Empty message with a fresh id and the default encoding
    fn new_empty_message(&self) -> Message {
        let mut msg = Message::with_id(self.generate_id());
        msg.set_content_encoding(self.default_encoding().map(str::to_string));
        msg
    }

    fn new_message(&self, payload: Vec<u8>) -> Message {
        let mut msg = self.new_empty_message();
        msg.set_payload(payload);
        msg
    }

    fn new_message_with_encoding(&self, payload: Vec<u8>, encoding: &str) -> Message {
        let mut msg = self.new_message(payload);
        msg.set_content_encoding(Some(encoding.to_string()));
        msg
    }

    fn new_string_message(&self, text: &str) -> ServiceResult<Message> {
        let mut msg = self.new_empty_message();
        let encoding = self.default_encoding().map(str::to_string);
        msg.set_content(text, encoding.as_deref())?;
        Ok(msg)
    }

    fn new_string_message_with_encoding(&self, text: &str, encoding: &str) -> ServiceResult<Message> {
        let mut msg = self.new_empty_message();
        msg.set_content(text, Some(encoding))?;
        Ok(msg)
    }

    /// Clone `source` keeping its id, trace and attachments but only the named
    /// metadata keys; keys missing from `source` are skipped. The payload is
    /// left empty.
    fn new_message_preserving(&self, source: &Message, metadata_keys_to_preserve: &[&str]) -> Message {
        let mut result = Message::with_id(source.unique_id());
        result.set_content_encoding(self.default_encoding().map(str::to_string));
        for key in metadata_keys_to_preserve {
            if let Some(value) = source.metadata_value(key) {
                result.add_metadata(*key, value);
            }
        }
        for marker in source.markers() {
            result.push_marker(marker.clone());
        }
        result.extend_objects(source.objects());
        result
    }

    /// Re-create `source` with this factory: payload, encoding and all metadata
    fn translate(&self, source: &Message) -> Message {
        let keys: Vec<&str> = source.metadata().iter().map(|e| e.key.as_str()).collect();
        let mut result = self.new_message_preserving(source, &keys);
        result.set_payload(source.payload().to_vec());
        result.set_content_encoding(source.content_encoding().map(str::to_string));
        if let Some(next) = source.next_service_id() {
            result.set_next_service_id(next);
        }
        result
    }
}

/// Factory backed by an in-memory byte payload
#[derive(Debug, Clone, Default)]
pub struct DefaultMessageFactory {
    default_encoding: Option<String>,
}

impl DefaultMessageFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_encoding(encoding: impl Into<String>) -> Self {
        Self {
            default_encoding: Some(encoding.into()),
        }
    }
}

impl MessageFactory for DefaultMessageFactory {
    fn default_encoding(&self) -> Option<&str> {
        self.default_encoding.as_deref()
    }
}
