//! # Error Types
//!
//! Structured error kinds for every layer of the runtime. Lifecycle errors are
//! always surfaced to whoever requested the transition; service errors are
//! recovered per `continue_on_fail` or routed to the workflow's error handler;
//! produce errors always go to the error handler.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::lifecycle::{LifecycleRequest, LifecycleState};

/// Errors raised by lifecycle transitions
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Invalid lifecycle transition for {component}: cannot {request} from {from}")]
    InvalidTransition {
        component: String,
        from: LifecycleState,
        request: LifecycleRequest,
    },

    #[error("Parent state violation for {component}: cannot {request} while parent is {parent_state}")]
    ParentState {
        component: String,
        request: LifecycleRequest,
        parent_state: LifecycleState,
    },

    #[error("Lifecycle hook {hook} failed for {component}: {source}")]
    HookFailed {
        component: String,
        hook: LifecycleRequest,
        #[source]
        source: Box<RuntimeError>,
    },
}

/// Failure of a service in a chain
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service {service_id} failed: {reason}")]
    Failed { service_id: String, reason: String },

    #[error("Service configuration error: {0}")]
    Configuration(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] Box<LifecycleError>),
}

/// Outbound delivery failure
#[derive(Error, Debug)]
pub enum ProduceError {
    #[error("Producer {producer_id} failed: {reason}")]
    Failed { producer_id: String, reason: String },

    #[error("Producer session error: {0}")]
    Session(String),
}

/// Aggregate of parallel or cloned sub-failures; only the first is surfaced
#[derive(Error, Debug)]
#[error("{failed} of {submitted} submissions failed; first failure: {first}")]
pub struct CompositeError {
    pub first: Box<ServiceError>,
    pub failed: usize,
    pub submitted: usize,
}

/// Worker and object pool failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool exhausted: no worker available after {waited_ms}ms")]
    Exhausted { waited_ms: u64 },

    #[error("Pool is closed")]
    Closed,

    #[error("Pooled object creation failed: {0}")]
    Factory(String),
}

/// Structural workflow failures (never raised for a single message's failure)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Workflow {workflow_id} is not started (current state: {state})")]
    NotStarted {
        workflow_id: String,
        state: LifecycleState,
    },
}

/// Top-level error for the runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Produce(#[from] ProduceError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LifecycleError> for ServiceError {
    fn from(err: LifecycleError) -> Self {
        ServiceError::Lifecycle(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
pub type ProduceResult<T> = std::result::Result<T, ProduceError>;
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Helper for building a service failure
pub fn service_failed(service_id: impl Into<String>, reason: impl Into<String>) -> ServiceError {
    ServiceError::Failed {
        service_id: service_id.into(),
        reason: reason.into(),
    }
}

/// Helper for building a produce failure
pub fn produce_failed(producer_id: impl Into<String>, reason: impl Into<String>) -> ProduceError {
    ProduceError::Failed {
        producer_id: producer_id.into(),
        reason: reason.into(),
    }
}
