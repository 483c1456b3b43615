//! # Splitters
//!
//! Policies that cut one message into many and the pooled service that
//! processes the pieces in parallel.

pub mod pooling;
#[allow(clippy::module_inception)]
pub mod splitter;

pub use pooling::{PoolingSplitterService, ServiceWorkerFactory};
pub use splitter::{DelimiterSplitter, LineCountSplitter, MessageSplitter, MetadataListSplitter};
