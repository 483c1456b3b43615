//! # Runtime Containers
//!
//! Adapters own channels, channels own workflows. [`RuntimeTree`] records the
//! hierarchy so that lifecycle requests on any node can be checked against the
//! parent's state, and [`ManagementBridge`] injects messages into a workflow.

pub mod adapter;
pub mod channel;
pub mod management;
pub mod tree;

pub use adapter::Adapter;
pub use channel::Channel;
pub use management::ManagementBridge;
pub use tree::{NodeComponent, NodeId, NodeKind, RuntimeTree};
