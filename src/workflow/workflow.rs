//! # Standard Workflow
//!
//! Receives a message, runs it through the service chain and hands the result
//! to the producer. A failure in the chain or the producer goes to the error
//! handler and never stops the workflow accepting the next message. Only a
//! workflow that is not `Started` refuses a message.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::interceptor::{
    CompletionMonitorInterceptor, InFlightInterceptor, MessageMetricsInterceptor,
    ReplyCacheInterceptor, WorkflowInterceptor, WorkflowOutcome,
};
use crate::config::{ConfigurationError, MetricsConfig};
use crate::constants::markers::{WORKFLOW_FAILED, WORKFLOW_PRODUCED, WORKFLOW_RECEIVED, WORKFLOW_SKIPPED_PRODUCER};
use crate::constants::metadata::{FAILURE_REASON, WORKFLOW_ID};
use crate::endpoint::{ConsumerCapabilities, ErrorHandler, LoggingErrorHandler, MessageListener, NullProducer, Producer};
use crate::error::{Result, RuntimeError, WorkflowError};
use crate::lifecycle::{Component, LifecycleCell, LifecycleState, StateManagedComponent};
use crate::message::{DefaultMessageFactory, Message, MessageFactory};
use crate::poller::fixed_interval::panic_message;
use crate::service::{ServiceCollection, Service};

/// Service chain, producer and error handler wired together
pub struct StandardWorkflow {
    unique_id: String,
    services: Arc<dyn Service>,
    producer: Arc<dyn Producer>,
    error_handler: Arc<dyn ErrorHandler>,
    message_factory: Arc<dyn MessageFactory>,
    interceptors: Vec<Arc<dyn WorkflowInterceptor>>,
    in_flight: Arc<InFlightInterceptor>,
    reply_cache: Arc<ReplyCacheInterceptor>,
    metrics: Option<Arc<MessageMetricsInterceptor>>,
    completion_monitor_attached: bool,
    max_concurrency: usize,
    concurrency: Option<Arc<Semaphore>>,
    lifecycle: LifecycleCell,
}

impl StandardWorkflow {
    pub fn builder(unique_id: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(unique_id)
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn message_factory(&self) -> &Arc<dyn MessageFactory> {
        &self.message_factory
    }

    pub fn reply_cache(&self) -> &Arc<ReplyCacheInterceptor> {
        &self.reply_cache
    }

    pub fn in_flight(&self) -> &Arc<InFlightInterceptor> {
        &self.in_flight
    }

    pub fn metrics(&self) -> Option<&Arc<MessageMetricsInterceptor>> {
        self.metrics.as_ref()
    }

    /// Whether the build attached a completion monitor (pooled workflow fed by
    /// a consumer that awaits completion)
    pub fn completion_monitor_attached(&self) -> bool {
        self.completion_monitor_attached
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn interceptor_names(&self) -> Vec<String> {
        self.interceptors.iter().map(|i| i.name().to_string()).collect()
    }

    /// Process one message
    ///
    /// Fails only when the workflow is not started. Every other failure is
    /// handed to the error handler and reported as [`WorkflowOutcome::Failed`].
    pub async fn on_message(&self, mut msg: Message) -> std::result::Result<WorkflowOutcome, WorkflowError> {
        let state = self.state();
        if state != LifecycleState::Started {
            warn!(
                workflow_id = %self.unique_id,
                message_id = %msg.unique_id(),
                state = %state,
                "⚠️ Message rejected, workflow not started"
            );
            return Err(WorkflowError::NotStarted {
                workflow_id: self.unique_id.clone(),
                state,
            });
        }

        let _permit = match &self.concurrency {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };

        let started = Instant::now();
        msg.add_metadata(WORKFLOW_ID, self.unique_id.as_str());
        msg.add_marker(WORKFLOW_RECEIVED, self.unique_id.as_str(), true);
        for interceptor in &self.interceptors {
            interceptor.workflow_start(&mut msg);
        }

        let chain_result = AssertUnwindSafe(self.services.do_service(&mut msg))
            .catch_unwind()
            .await
            .map_err(|panic| self.panicked(panic.as_ref(), "service chain"))
            .and_then(|result| result.map_err(RuntimeError::from));
        let outcome = match chain_result {
            Err(err) => self.route_failure(&mut msg, err).await,
            Ok(()) if msg.is_stop_processing() => {
                msg.add_marker(WORKFLOW_SKIPPED_PRODUCER, self.unique_id.as_str(), true);
                debug!(
                    workflow_id = %self.unique_id,
                    message_id = %msg.unique_id(),
                    "Stop processing set, skipping producer"
                );
                WorkflowOutcome::Skipped
            }
            Ok(()) => {
                let produced = AssertUnwindSafe(self.producer.produce(&msg))
                    .catch_unwind()
                    .await
                    .map_err(|panic| self.panicked(panic.as_ref(), "producer"))
                    .and_then(|result| result.map_err(RuntimeError::from));
                match produced {
                    Ok(()) => {
                        msg.add_marker(WORKFLOW_PRODUCED, self.producer.component_id(), true);
                        WorkflowOutcome::Produced
                    }
                    Err(err) => self.route_failure(&mut msg, err).await,
                }
            }
        };

        for interceptor in &self.interceptors {
            interceptor.workflow_end(&msg, outcome);
        }
        debug!(
            workflow_id = %self.unique_id,
            message_id = %msg.unique_id(),
            outcome = %outcome,
            duration_ms = started.elapsed().as_millis() as u64,
            "Workflow finished message"
        );
        Ok(outcome)
    }

    fn panicked(&self, panic: &(dyn std::any::Any + Send), stage: &str) -> RuntimeError {
        let panic_msg = panic_message(panic);
        error!(
            workflow_id = %self.unique_id,
            stage = stage,
            panic_msg = %panic_msg,
            "🔴 Panic while processing message"
        );
        RuntimeError::Internal(format!("{stage} panicked: {panic_msg}"))
    }

    async fn route_failure(&self, msg: &mut Message, err: RuntimeError) -> WorkflowOutcome {
        warn!(
            workflow_id = %self.unique_id,
            message_id = %msg.unique_id(),
            error = %err,
            "🔴 Message failed, passing to error handler"
        );
        msg.add_metadata(FAILURE_REASON, err.to_string());
        msg.add_marker(WORKFLOW_FAILED, self.unique_id.as_str(), false);
        self.error_handler.handle_processing_exception(msg, &err).await;
        WorkflowOutcome::Failed
    }
}

#[async_trait]
impl Component for StandardWorkflow {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn init(&self) -> Result<()> {
        self.producer.request_init().await?;
        self.services.request_init().await?;
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.producer.request_start().await?;
        self.services.request_start().await?;
        info!(workflow_id = %self.unique_id, "🟢 Workflow started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.services.request_stop().await?;
        self.producer.request_stop().await?;
        info!(
            workflow_id = %self.unique_id,
            in_flight = self.in_flight.in_flight(),
            "🛑 Workflow stopped"
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.services.request_close().await?;
        self.producer.request_close().await?;
        Ok(())
    }
}

crate::state_managed!(StandardWorkflow);

#[async_trait]
impl MessageListener for StandardWorkflow {
    async fn on_message(&self, msg: Message) -> Result<()> {
        StandardWorkflow::on_message(self, msg).await?;
        Ok(())
    }
}

/// Assembles a [`StandardWorkflow`]
pub struct WorkflowBuilder {
    unique_id: String,
    services: Option<Arc<dyn Service>>,
    producer: Option<Arc<dyn Producer>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    message_factory: Option<Arc<dyn MessageFactory>>,
    interceptors: Vec<Arc<dyn WorkflowInterceptor>>,
    consumer_capabilities: ConsumerCapabilities,
    max_concurrency: usize,
    metrics: MetricsConfig,
}

impl WorkflowBuilder {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            services: None,
            producer: None,
            error_handler: None,
            message_factory: None,
            interceptors: Vec::new(),
            consumer_capabilities: ConsumerCapabilities::default(),
            max_concurrency: 1,
            metrics: MetricsConfig::default(),
        }
    }

    /// Service chain; an empty sequential collection when unset
    pub fn services(mut self, services: Arc<dyn Service>) -> Self {
        self.services = Some(services);
        self
    }

    /// Producer; a [`NullProducer`] when unset
    pub fn producer(mut self, producer: Arc<dyn Producer>) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Error handler; a [`LoggingErrorHandler`] when unset
    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.message_factory = Some(factory);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn WorkflowInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Capabilities of the consumer feeding this workflow
    pub fn consumer_capabilities(mut self, capabilities: ConsumerCapabilities) -> Self {
        self.consumer_capabilities = capabilities;
        self
    }

    /// Messages processed concurrently; more than one makes the workflow pooled
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = config;
        self
    }

    pub fn disable_metrics(mut self) -> Self {
        self.metrics.enabled = false;
        self
    }

    pub fn build(self) -> std::result::Result<StandardWorkflow, ConfigurationError> {
        if self.unique_id.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field("unique_id", "workflow"));
        }

        let in_flight = Arc::new(InFlightInterceptor::new());
        let reply_cache = Arc::new(ReplyCacheInterceptor::new());
        let mut interceptors: Vec<Arc<dyn WorkflowInterceptor>> = vec![in_flight.clone()];

        let metrics = self.metrics.enabled.then(|| {
            Arc::new(MessageMetricsInterceptor::from_config(
                format!("{}-metrics", self.unique_id),
                &self.metrics,
            ))
        });
        if let Some(metrics) = &metrics {
            interceptors.push(metrics.clone());
        }

        let pooled = self.max_concurrency > 1;
        let completion_monitor_attached = pooled && self.consumer_capabilities.awaits_completion;
        if completion_monitor_attached {
            interceptors.push(Arc::new(CompletionMonitorInterceptor::new()));
        }

        interceptors.extend(self.interceptors);
        // Must stay last: replies are cached after every other interceptor ran
        interceptors.push(reply_cache.clone());

        let services = self
            .services
            .unwrap_or_else(|| Arc::new(ServiceCollection::sequential(format!("{}-services", self.unique_id))));

        debug!(
            workflow_id = %self.unique_id,
            max_concurrency = self.max_concurrency,
            completion_monitor_attached = completion_monitor_attached,
            metrics_enabled = metrics.is_some(),
            "Built workflow"
        );

        Ok(StandardWorkflow {
            services,
            producer: self.producer.unwrap_or_else(|| Arc::new(NullProducer::default())),
            error_handler: self.error_handler.unwrap_or_else(|| Arc::new(LoggingErrorHandler)),
            message_factory: self
                .message_factory
                .unwrap_or_else(|| Arc::new(DefaultMessageFactory::new())),
            interceptors,
            in_flight,
            reply_cache,
            metrics,
            completion_monitor_attached,
            max_concurrency: self.max_concurrency,
            concurrency: pooled.then(|| Arc::new(Semaphore::new(self.max_concurrency))),
            lifecycle: LifecycleCell::new(),
            unique_id: self.unique_id,
        })
    }
}
