#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Integration Runtime
//!
//! Embeddable core of a message integration runtime: moves a message from an
//! inbound endpoint through a chain of services to an outbound producer,
//! while managing the lifecycle of every component involved and tolerating
//! partial failure.
//!
//! ## Module Organization
//!
//! - [`lifecycle`] - Component state machine and parent/child gating
//! - [`message`] - Message, metadata, trace markers and message factories
//! - [`service`] - Services, composite chains and pooled split processing
//! - [`workflow`] - Workflow engine, interceptors and lifecycle strategies
//! - [`poller`] - Fixed-interval, mutually exclusive polling
//! - [`pool`] - Bounded worker pool and reusable object pool
//! - [`session`] - Producer session reuse strategies
//! - [`runtime`] - Adapter / channel / workflow tree and management bridge
//! - [`endpoint`] - Consumer, producer, connection and error handler contracts
//! - [`auth`] - Process-wide resource authenticator registry
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use integration_runtime::endpoint::CapturingProducer;
//! use integration_runtime::lifecycle::StateManagedComponent;
//! use integration_runtime::message::{DefaultMessageFactory, MessageFactory};
//! use integration_runtime::service::{AddMetadataService, ServiceCollection};
//! use integration_runtime::workflow::StandardWorkflow;
//!
//! # async fn example() -> integration_runtime::Result<()> {
//! let services = ServiceCollection::sequential("chain")
//!     .with_service(Arc::new(AddMetadataService::new("tag").with_metadata("source", "demo")));
//! let producer = Arc::new(CapturingProducer::new("out"));
//! let workflow = StandardWorkflow::builder("demo-workflow")
//!     .services(Arc::new(services))
//!     .producer(producer.clone())
//!     .build()?;
//!
//! workflow.request_init().await?;
//! workflow.request_start().await?;
//! let msg = DefaultMessageFactory::new().new_string_message("hello")?;
//! workflow.on_message(msg).await?;
//! assert_eq!(producer.produced_count(), 1);
//! workflow.request_close().await?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
pub mod macros;

pub mod auth;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod message;
pub mod poller;
pub mod pool;
pub mod runtime;
pub mod service;
pub mod session;
pub mod workflow;

pub use config::{ConfigLoader, ConfigurationError, RuntimeConfig};
pub use error::{
    CompositeError, LifecycleError, PoolError, ProduceError, Result, RuntimeError, ServiceError,
    WorkflowError,
};
pub use lifecycle::{Component, LifecycleRequest, LifecycleState, StateManagedComponent};
pub use message::{Message, MessageFactory, SerializableMessage};
pub use runtime::{Adapter, Channel, ManagementBridge, NodeId, RuntimeTree};
pub use service::{CompositionPolicy, Service, ServiceCollection};
pub use workflow::{StandardWorkflow, WorkflowOutcome};
