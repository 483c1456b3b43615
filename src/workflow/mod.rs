//! # Workflow Orchestration
//!
//! [`StandardWorkflow`] ties a service chain to a producer and an error
//! handler; interceptors observe every message; lifecycle strategies decide
//! how a channel brings its workflows up and down.

pub mod interceptor;
pub mod lifecycle_strategy;
#[allow(clippy::module_inception)]
pub mod workflow;

pub use interceptor::{
    CompletionMonitor, CompletionMonitorInterceptor, InFlightInterceptor, MessageMetricsInterceptor,
    MessageMetricsSlice, ReplyCacheInterceptor, WorkflowInterceptor, WorkflowOutcome,
};
pub use lifecycle_strategy::{
    DefaultWorkflowLifecycleStrategy, WorkflowLifecycleStrategy, WorkflowRetryAndContinue,
};
pub use workflow::{StandardWorkflow, WorkflowBuilder};
