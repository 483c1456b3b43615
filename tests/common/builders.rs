//! Shared stubs and builders for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use integration_runtime::endpoint::{CapturingErrorHandler, CapturingProducer, ConsumerLock, PollingConsumer};
use integration_runtime::error::{service_failed, RuntimeError, ServiceResult};
use integration_runtime::lifecycle::{Component, LifecycleCell, StateManagedComponent};
use integration_runtime::message::Message;
use integration_runtime::service::{Service, ServiceCollection};
use integration_runtime::workflow::StandardWorkflow;
use integration_runtime::state_managed;

/// Ordered log shared between stub services
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Copies of the message as each service received it
pub type SeenLog = Arc<Mutex<Vec<(String, Message)>>>;

pub fn seen_log() -> SeenLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Service that records its id, optionally failing or sleeping first
pub struct RecordingService {
    id: String,
    log: CallLog,
    fail: bool,
    panic: bool,
    continue_on_fail: bool,
    seen: Option<SeenLog>,
    delay: Duration,
    next: Option<String>,
    lifecycle: LifecycleCell,
}

impl RecordingService {
    pub fn new(id: &str, log: &CallLog) -> Self {
        Self {
            id: id.to_string(),
            log: Arc::clone(log),
            fail: false,
            panic: false,
            continue_on_fail: false,
            seen: None,
            delay: Duration::ZERO,
            next: None,
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn recording_into(mut self, seen: &SeenLog) -> Self {
        self.seen = Some(Arc::clone(seen));
        self
    }

    pub fn continue_on_fail(mut self) -> Self {
        self.continue_on_fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn branching_to(mut self, next: &str) -> Self {
        self.next = Some(next.to_string());
        self
    }

    pub fn arc(self) -> Arc<dyn Service> {
        Arc::new(self)
    }
}

#[async_trait]
impl Component for RecordingService {
    fn component_id(&self) -> &str {
        &self.id
    }
}

state_managed!(RecordingService);

#[async_trait]
impl Service for RecordingService {
    fn unique_id(&self) -> &str {
        &self.id
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    fn is_branching(&self) -> bool {
        self.next.is_some()
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.lock().push(self.id.clone());
        if let Some(seen) = &self.seen {
            seen.lock().push((self.id.clone(), msg.clone()));
        }
        if self.panic {
            panic!("{} blew up", self.id);
        }
        if self.fail {
            return Err(service_failed(self.id.as_str(), "configured to fail"));
        }
        msg.add_metadata(format!("visited.{}", self.id), "true");
        if let Some(next) = &self.next {
            msg.set_next_service_id(next.as_str());
        }
        Ok(())
    }
}

/// Workflow wired to a capturing producer and a capturing error handler
pub struct WorkflowHarness {
    pub workflow: Arc<StandardWorkflow>,
    pub producer: Arc<CapturingProducer>,
    pub errors: Arc<CapturingErrorHandler>,
}

impl WorkflowHarness {
    pub fn new(id: &str, services: ServiceCollection) -> Self {
        let producer = Arc::new(CapturingProducer::new(format!("{id}-producer")));
        let errors = Arc::new(CapturingErrorHandler::new());
        let workflow = StandardWorkflow::builder(id)
            .services(Arc::new(services))
            .producer(producer.clone())
            .error_handler(errors.clone())
            .build()
            .expect("workflow should build");
        Self {
            workflow: Arc::new(workflow),
            producer,
            errors,
        }
    }

    pub async fn started(id: &str, services: ServiceCollection) -> Self {
        let harness = Self::new(id, services);
        harness.workflow.request_init().await.expect("init");
        harness.workflow.request_start().await.expect("start");
        harness
    }
}

/// Polling consumer that counts calls and can be told to fail or panic
#[derive(Default)]
pub struct ScriptedConsumer {
    pub lock: ConsumerLock,
    pub process_calls: AtomicUsize,
    pub connection_exceptions: AtomicUsize,
    pub fail: AtomicBool,
    pub panic: AtomicBool,
    pub deny_lock: AtomicBool,
}

#[async_trait]
impl PollingConsumer for ScriptedConsumer {
    fn consumer_id(&self) -> &str {
        "scripted"
    }

    fn attempt_lock(&self) -> bool {
        !self.deny_lock.load(Ordering::SeqCst) && self.lock.try_lock()
    }

    fn release_lock(&self) {
        self.lock.release();
    }

    async fn process_messages(&self) -> integration_runtime::Result<usize> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic.load(Ordering::SeqCst) {
            panic!("scripted consumer panic");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RuntimeError::Connection("scripted failure".to_string()));
        }
        Ok(1)
    }

    async fn handle_connection_exception(&self) {
        self.connection_exceptions.fetch_add(1, Ordering::SeqCst);
    }
}
