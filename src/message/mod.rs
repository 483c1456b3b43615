//! # Message Model
//!
//! The unit of work that flows through a workflow: a byte payload with an
//! optional text encoding, ordered string metadata, process-local object
//! attachments, an immutable unique id and an append-only lifecycle trace.
//!
//! Messages are created by a [`MessageFactory`]. The selective-preserve clone
//! ([`MessageFactory::new_message_preserving`]) is the primitive used by the
//! cloning service collection, splitters and cross-factory translation.

pub mod factory;
#[allow(clippy::module_inception)]
pub mod message;
pub mod serializable;

pub use factory::{DefaultMessageFactory, MessageFactory};
pub use message::{Message, MessageMarker, MetadataElement, ObjectAttachment};
pub use serializable::{SerializableMessage, SerializableMessageTranslator};
