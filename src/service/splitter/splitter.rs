//! Message splitting policies.
//!
//! Each split message gets a fresh unique id, the split sequence number and the
//! id of the message it was cut from. Source metadata is copied to every split
//! message unless disabled.

use crate::constants::markers::MESSAGE_SPLIT;
use crate::constants::metadata::{SPLIT_PARENT_ID, SPLIT_SEQUENCE};
use crate::error::{ServiceError, ServiceResult};
use crate::message::{Message, MessageFactory};

/// Splits one message into many
pub trait MessageSplitter: Send + Sync {
    fn split_message(&self, msg: &Message, factory: &dyn MessageFactory) -> ServiceResult<Vec<Message>>;
}

fn split_child(
    source: &Message,
    factory: &dyn MessageFactory,
    copy_metadata: bool,
    sequence: usize,
) -> Message {
    let mut child = factory.new_empty_message();
    child.set_content_encoding(source.content_encoding().map(str::to_string));
    if copy_metadata {
        for element in source.metadata() {
            child.add_metadata(element.key.as_str(), element.value.as_str());
        }
    }
    child.add_metadata(SPLIT_SEQUENCE, sequence.to_string());
    child.add_metadata(SPLIT_PARENT_ID, source.unique_id());
    child.add_marker(MESSAGE_SPLIT, source.unique_id(), true);
    child
}

fn text_child(
    source: &Message,
    factory: &dyn MessageFactory,
    copy_metadata: bool,
    sequence: usize,
    text: &str,
) -> ServiceResult<Message> {
    let mut child = split_child(source, factory, copy_metadata, sequence);
    child.set_content(text, source.content_encoding())?;
    Ok(child)
}

/// Positional split: every `lines_per_message` lines form one message
#[derive(Debug, Clone)]
pub struct LineCountSplitter {
    lines_per_message: usize,
    ignore_blank_lines: bool,
    copy_metadata: bool,
}

impl LineCountSplitter {
    pub fn new(lines_per_message: usize) -> Self {
        Self {
            lines_per_message,
            ignore_blank_lines: false,
            copy_metadata: true,
        }
    }

    pub fn with_ignore_blank_lines(mut self, ignore: bool) -> Self {
        self.ignore_blank_lines = ignore;
        self
    }

    pub fn with_copy_metadata(mut self, copy_metadata: bool) -> Self {
        self.copy_metadata = copy_metadata;
        self
    }
}

impl MessageSplitter for LineCountSplitter {
    fn split_message(&self, msg: &Message, factory: &dyn MessageFactory) -> ServiceResult<Vec<Message>> {
        if self.lines_per_message == 0 {
            return Err(ServiceError::Configuration(
                "line count splitter needs at least one line per message".to_string(),
            ));
        }
        let content = msg.content()?;
        let lines: Vec<&str> = content
            .lines()
            .filter(|line| !(self.ignore_blank_lines && line.trim().is_empty()))
            .collect();

        lines
            .chunks(self.lines_per_message)
            .enumerate()
            .map(|(sequence, chunk)| {
                text_child(msg, factory, self.copy_metadata, sequence + 1, &chunk.join("\n"))
            })
            .collect()
    }
}

/// Splits the payload text on a delimiter, dropping empty pieces
#[derive(Debug, Clone)]
pub struct DelimiterSplitter {
    delimiter: String,
    copy_metadata: bool,
}

impl DelimiterSplitter {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            copy_metadata: true,
        }
    }

    pub fn with_copy_metadata(mut self, copy_metadata: bool) -> Self {
        self.copy_metadata = copy_metadata;
        self
    }
}

impl MessageSplitter for DelimiterSplitter {
    fn split_message(&self, msg: &Message, factory: &dyn MessageFactory) -> ServiceResult<Vec<Message>> {
        if self.delimiter.is_empty() {
            return Err(ServiceError::Configuration("delimiter must not be empty".to_string()));
        }
        let content = msg.content()?;
        content
            .split(self.delimiter.as_str())
            .filter(|piece| !piece.is_empty())
            .enumerate()
            .map(|(sequence, piece)| text_child(msg, factory, self.copy_metadata, sequence + 1, piece))
            .collect()
    }
}

/// Query-based split over a separated list held in one metadata value
///
/// Each split message carries the source payload with the metadata key set to
/// a single list item. A missing key yields no split messages.
#[derive(Debug, Clone)]
pub struct MetadataListSplitter {
    metadata_key: String,
    separator: String,
    copy_metadata: bool,
}

impl MetadataListSplitter {
    pub fn new(metadata_key: impl Into<String>) -> Self {
        Self {
            metadata_key: metadata_key.into(),
            separator: ",".to_string(),
            copy_metadata: true,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_copy_metadata(mut self, copy_metadata: bool) -> Self {
        self.copy_metadata = copy_metadata;
        self
    }
}

impl MessageSplitter for MetadataListSplitter {
    fn split_message(&self, msg: &Message, factory: &dyn MessageFactory) -> ServiceResult<Vec<Message>> {
        let Some(list) = msg.metadata_value(&self.metadata_key) else {
            return Ok(Vec::new());
        };
        let items = list
            .split(self.separator.as_str())
            .map(str::trim)
            .filter(|item| !item.is_empty());

        Ok(items
            .enumerate()
            .map(|(sequence, item)| {
                let mut child = split_child(msg, factory, self.copy_metadata, sequence + 1);
                child.set_payload(msg.payload().to_vec());
                child.add_metadata(self.metadata_key.as_str(), item);
                child
            })
            .collect())
    }
}
