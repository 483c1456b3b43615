use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::metadata::{FLAG_TRUE, STOP_PROCESSING_KEY, WORKFLOW_SKIP_PRODUCER};
use crate::error::{ServiceError, ServiceResult};

/// Opaque in-memory value passed between steps; never serialized
pub type ObjectAttachment = Arc<dyn Any + Send + Sync>;

/// One metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataElement {
    pub key: String,
    pub value: String,
}

/// A processing milestone in a message's lifecycle trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMarker {
    pub name: String,
    pub qualifier: String,
    pub sequence: usize,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// The unit of work flowing through a workflow
///
/// Metadata keys are case sensitive; adding an existing key overwrites its
/// value in place, so insertion order is kept for inspection. Cloning yields an
/// independent copy of payload, metadata and trace; object attachments are
/// shared handles.
#[derive(Clone)]
pub struct Message {
    unique_id: String,
    payload: Vec<u8>,
    content_encoding: Option<String>,
    metadata: Vec<MetadataElement>,
    objects: HashMap<String, ObjectAttachment>,
    markers: Vec<MessageMarker>,
    next_service_id: Option<String>,
}

impl Message {
    /// Create an empty message; message factories are the usual entry point
    pub(crate) fn with_id(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            payload: Vec::new(),
            content_encoding: None,
            metadata: Vec::new(),
            objects: HashMap::new(),
            markers: Vec::new(),
            next_service_id: None,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        self.payload = payload.into();
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_deref()
    }

    pub fn set_content_encoding(&mut self, encoding: Option<String>) {
        self.content_encoding = encoding;
    }

    /// Payload decoded with the message's encoding (UTF-8 when unset)
    pub fn content(&self) -> ServiceResult<String> {
        let encoding = resolve_encoding(self.content_encoding.as_deref())?;
        let (text, _) = encoding.decode_without_bom_handling(&self.payload);
        Ok(text.into_owned())
    }

    /// Replace the payload with `text` encoded as `encoding` (UTF-8 when `None`)
    pub fn set_content(&mut self, text: &str, encoding: Option<&str>) -> ServiceResult<()> {
        let resolved = resolve_encoding(encoding)?;
        let (bytes, _, unmappable) = resolved.encode(text);
        if unmappable {
            return Err(ServiceError::Encoding(format!(
                "content of message {} is not representable in {}",
                self.unique_id,
                resolved.name()
            )));
        }
        self.payload = bytes.into_owned();
        self.content_encoding = encoding.map(str::to_string);
        Ok(())
    }

    /// Add or overwrite a metadata value
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.metadata.iter_mut().find(|element| element.key == key) {
            Some(existing) => existing.value = value,
            None => self.metadata.push(MetadataElement { key, value }),
        }
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|element| element.key == key)
            .map(|element| element.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.metadata.iter().any(|element| element.key == key)
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<String> {
        let index = self.metadata.iter().position(|element| element.key == key)?;
        Some(self.metadata.remove(index).value)
    }

    /// Metadata in insertion order
    pub fn metadata(&self) -> &[MetadataElement] {
        &self.metadata
    }

    pub fn add_object(&mut self, key: impl Into<String>, value: ObjectAttachment) {
        self.objects.insert(key.into(), value);
    }

    pub fn object(&self, key: &str) -> Option<&ObjectAttachment> {
        self.objects.get(key)
    }

    /// Typed access to an object attachment
    pub fn object_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.objects
            .get(key)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    pub fn objects(&self) -> &HashMap<String, ObjectAttachment> {
        &self.objects
    }

    pub(crate) fn extend_objects(&mut self, objects: &HashMap<String, ObjectAttachment>) {
        for (key, value) in objects {
            self.objects.insert(key.clone(), Arc::clone(value));
        }
    }

    /// Append a marker to the lifecycle trace
    pub fn add_marker(&mut self, name: impl Into<String>, qualifier: impl Into<String>, success: bool) {
        let sequence = self.markers.len();
        self.markers.push(MessageMarker {
            name: name.into(),
            qualifier: qualifier.into(),
            sequence,
            timestamp: Utc::now(),
            success,
        });
    }

    pub(crate) fn push_marker(&mut self, marker: MessageMarker) {
        self.markers.push(marker);
    }

    pub fn markers(&self) -> &[MessageMarker] {
        &self.markers
    }

    pub fn next_service_id(&self) -> Option<&str> {
        self.next_service_id.as_deref()
    }

    /// Branching signal consulted by a branching service collection
    pub fn set_next_service_id(&mut self, id: impl Into<String>) {
        self.next_service_id = Some(id.into());
    }

    pub fn take_next_service_id(&mut self) -> Option<String> {
        self.next_service_id.take()
    }

    /// Whether a service asked for processing (and production) to stop
    pub fn is_stop_processing(&self) -> bool {
        [STOP_PROCESSING_KEY, WORKFLOW_SKIP_PRODUCER]
            .iter()
            .any(|key| self.metadata_value(key) == Some(FLAG_TRUE))
    }

    pub fn set_stop_processing(&mut self) {
        self.add_metadata(STOP_PROCESSING_KEY, FLAG_TRUE);
        self.add_metadata(WORKFLOW_SKIP_PRODUCER, FLAG_TRUE);
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("unique_id", &self.unique_id)
            .field("size", &self.payload.len())
            .field("content_encoding", &self.content_encoding)
            .field("metadata", &self.metadata)
            .field("objects", &self.objects.keys().collect::<Vec<_>>())
            .field("markers", &self.markers.len())
            .field("next_service_id", &self.next_service_id)
            .finish()
    }
}

pub(crate) fn resolve_encoding(label: Option<&str>) -> ServiceResult<&'static encoding_rs::Encoding> {
    match label {
        None => Ok(encoding_rs::UTF_8),
        Some(label) => encoding_rs::Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ServiceError::Encoding(format!("unsupported encoding: {label}"))),
    }
}
