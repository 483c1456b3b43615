//! # Workflow Lifecycle Strategies
//!
//! How a channel drives the lifecycle of its workflows. The default strategy
//! stops at the first failure; [`WorkflowRetryAndContinue`] retries each
//! workflow a bounded number of times and then moves on without it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::workflow::StandardWorkflow;
use crate::config::RetryConfig;
use crate::constants::defaults;
use crate::error::{LifecycleResult, Result};
use crate::lifecycle::{LifecycleRequest, StateManagedComponent};

async fn drive(workflow: &StandardWorkflow, request: LifecycleRequest) -> LifecycleResult<()> {
    match request {
        LifecycleRequest::Init => workflow.request_init().await,
        LifecycleRequest::Start => workflow.request_start().await,
        LifecycleRequest::Stop => workflow.request_stop().await,
        LifecycleRequest::Close => workflow.request_close().await,
    }
}

/// Applies a lifecycle request to an ordered list of workflows
#[async_trait]
pub trait WorkflowLifecycleStrategy: Send + Sync {
    async fn apply(&self, workflows: &[Arc<StandardWorkflow>], request: LifecycleRequest) -> Result<()>;

    async fn init(&self, workflows: &[Arc<StandardWorkflow>]) -> Result<()> {
        self.apply(workflows, LifecycleRequest::Init).await
    }

    async fn start(&self, workflows: &[Arc<StandardWorkflow>]) -> Result<()> {
        self.apply(workflows, LifecycleRequest::Start).await
    }

    async fn stop(&self, workflows: &[Arc<StandardWorkflow>]) -> Result<()> {
        self.apply(workflows, LifecycleRequest::Stop).await
    }

    async fn close(&self, workflows: &[Arc<StandardWorkflow>]) -> Result<()> {
        self.apply(workflows, LifecycleRequest::Close).await
    }
}

/// In order; the first failure aborts and is returned
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultWorkflowLifecycleStrategy;

#[async_trait]
impl WorkflowLifecycleStrategy for DefaultWorkflowLifecycleStrategy {
    async fn apply(&self, workflows: &[Arc<StandardWorkflow>], request: LifecycleRequest) -> Result<()> {
        for workflow in workflows {
            drive(workflow, request).await?;
        }
        Ok(())
    }
}

/// Retries each workflow, then skips it and continues with the next
///
/// A workflow gets `1 + max_retries` attempts (unbounded when `max_retries`
/// is -1), with `wait_between_retries` between consecutive attempts. No wait
/// follows the final failed attempt, so the next workflow starts straight
/// away. A workflow that exhausts its attempts is left in whatever state it
/// reached. Never returns an error.
#[derive(Debug, Clone)]
pub struct WorkflowRetryAndContinue {
    max_retries: i32,
    wait_between_retries: Duration,
}

impl Default for WorkflowRetryAndContinue {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            wait_between_retries: defaults::WAIT_BETWEEN_RETRIES,
        }
    }
}

impl WorkflowRetryAndContinue {
    pub fn new(max_retries: i32, wait_between_retries: Duration) -> Self {
        Self {
            max_retries,
            wait_between_retries,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.wait_between_retries())
    }

    pub fn max_retries(&self) -> i32 {
        self.max_retries
    }

    fn exhausted(&self, attempts: u64) -> bool {
        self.max_retries != defaults::INFINITE_RETRIES && attempts > self.max_retries.max(0) as u64
    }

    /// Attempts used; `false` when the workflow was skipped
    async fn apply_with_retry(&self, workflow: &StandardWorkflow, request: LifecycleRequest) -> (u64, bool) {
        let mut attempts = 0u64;
        loop {
            attempts += 1;
            match drive(workflow, request).await {
                Ok(()) => return (attempts, true),
                Err(err) if self.exhausted(attempts) => {
                    error!(
                        workflow_id = %workflow.unique_id(),
                        request = %request,
                        attempts = attempts,
                        error = %err,
                        "🔴 Giving up on workflow, continuing with the rest"
                    );
                    return (attempts, false);
                }
                Err(err) => {
                    warn!(
                        workflow_id = %workflow.unique_id(),
                        request = %request,
                        attempt = attempts,
                        error = %err,
                        wait_ms = self.wait_between_retries.as_millis() as u64,
                        "⚠️ Workflow lifecycle request failed, retrying"
                    );
                    tokio::time::sleep(self.wait_between_retries).await;
                }
            }
        }
    }
}

#[async_trait]
impl WorkflowLifecycleStrategy for WorkflowRetryAndContinue {
    async fn apply(&self, workflows: &[Arc<StandardWorkflow>], request: LifecycleRequest) -> Result<()> {
        let mut skipped = 0usize;
        for workflow in workflows {
            let (_, succeeded) = self.apply_with_retry(workflow, request).await;
            if !succeeded {
                skipped += 1;
            }
        }
        if skipped > 0 {
            info!(
                request = %request,
                skipped = skipped,
                total = workflows.len(),
                "Lifecycle request finished with skipped workflows"
            );
        }
        Ok(())
    }
}
