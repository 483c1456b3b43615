//! # Service Chain Execution
//!
//! Atomic services, the composite [`ServiceCollection`] that applies them under
//! a sequential, branching or cloning policy, the built-in services and the
//! pooled parallel splitter.

pub mod builtin;
pub mod collection;
pub mod splitter;
pub mod traits;

pub use builtin::{
    AddMetadataService, LogMessageService, NullService, SizeBasedBranchingService,
    StopProcessingService, ThrowExceptionService,
};
pub use collection::{CompositionPolicy, ServiceCollection};
pub use splitter::{
    DelimiterSplitter, LineCountSplitter, MessageSplitter, MetadataListSplitter,
    PoolingSplitterService,
};
pub use traits::{Service, ServiceFactory};
