//! # Built-in Services
//!
//! Small general-purpose services shipped with the runtime. They double as
//! building blocks for tests and demo chains.

use async_trait::async_trait;
use tracing::{debug, info};

use super::traits::Service;
use crate::error::{service_failed, Result, ServiceError, ServiceResult};
use crate::lifecycle::{Component, LifecycleCell};
use crate::message::Message;

/// Implements `Component` for a built-in service with `unique_id` and
/// `lifecycle` fields and no lifecycle hooks of its own
macro_rules! passive_component {
    ($type_name:ty) => {
        #[async_trait]
        impl Component for $type_name {
            fn component_id(&self) -> &str {
                &self.unique_id
            }
        }

        crate::state_managed!($type_name);
    };
}

/// Marks the message so no further service runs and the producer is skipped
#[derive(Debug, Default)]
pub struct StopProcessingService {
    unique_id: String,
    lifecycle: LifecycleCell,
}

impl StopProcessingService {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            lifecycle: LifecycleCell::new(),
        }
    }
}

passive_component!(StopProcessingService);

#[async_trait]
impl Service for StopProcessingService {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()> {
        msg.set_stop_processing();
        info!(
            service_id = %self.unique_id,
            message_id = %msg.unique_id(),
            "🛑 Stop processing set on message"
        );
        Ok(())
    }
}

/// Adds a fixed set of metadata entries, overwriting existing keys
#[derive(Debug, Default)]
pub struct AddMetadataService {
    unique_id: String,
    continue_on_fail: bool,
    entries: Vec<(String, String)>,
    lifecycle: LifecycleCell,
}

impl AddMetadataService {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }
}

passive_component!(AddMetadataService);

#[async_trait]
impl Service for AddMetadataService {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()> {
        for (key, value) in &self.entries {
            msg.add_metadata(key.as_str(), value.as_str());
        }
        Ok(())
    }
}

/// Always fails with the configured reason
#[derive(Debug, Default)]
pub struct ThrowExceptionService {
    unique_id: String,
    reason: String,
    continue_on_fail: bool,
    lifecycle: LifecycleCell,
}

impl ThrowExceptionService {
    pub fn new(unique_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            reason: reason.into(),
            ..Self::default()
        }
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }
}

passive_component!(ThrowExceptionService);

#[async_trait]
impl Service for ThrowExceptionService {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    async fn do_service(&self, _msg: &mut Message) -> ServiceResult<()> {
        Err(service_failed(&self.unique_id, &self.reason))
    }
}

/// Branches on payload size
///
/// Messages larger than `size_criteria` bytes go to the greater-than service;
/// everything else, including a message of exactly `size_criteria` bytes, goes
/// to the smaller service.
#[derive(Debug, Default)]
pub struct SizeBasedBranchingService {
    unique_id: String,
    greater_than_service_id: Option<String>,
    smaller_than_service_id: Option<String>,
    size_criteria: usize,
    lifecycle: LifecycleCell,
}

impl SizeBasedBranchingService {
    pub fn new(unique_id: impl Into<String>, size_criteria: usize) -> Self {
        Self {
            unique_id: unique_id.into(),
            size_criteria,
            ..Self::default()
        }
    }

    pub fn with_greater_than_service_id(mut self, id: impl Into<String>) -> Self {
        self.greater_than_service_id = Some(id.into());
        self
    }

    pub fn with_smaller_than_service_id(mut self, id: impl Into<String>) -> Self {
        self.smaller_than_service_id = Some(id.into());
        self
    }

    fn branch_ids(&self) -> ServiceResult<(&str, &str)> {
        match (
            self.greater_than_service_id.as_deref().filter(|id| !id.is_empty()),
            self.smaller_than_service_id.as_deref().filter(|id| !id.is_empty()),
        ) {
            (Some(greater), Some(smaller)) => Ok((greater, smaller)),
            _ => Err(ServiceError::Configuration(format!(
                "size based branching service {} needs both greater-than and smaller-than service ids",
                self.unique_id
            ))),
        }
    }
}

#[async_trait]
impl Component for SizeBasedBranchingService {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn init(&self) -> Result<()> {
        self.branch_ids()?;
        Ok(())
    }
}

crate::state_managed!(SizeBasedBranchingService);

#[async_trait]
impl Service for SizeBasedBranchingService {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn is_branching(&self) -> bool {
        true
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()> {
        let (greater, smaller) = self.branch_ids()?;
        let next = if msg.size() > self.size_criteria {
            greater
        } else {
            smaller
        };
        debug!(
            service_id = %self.unique_id,
            size = msg.size(),
            criteria = self.size_criteria,
            next_service_id = next,
            "Selected branch by size"
        );
        msg.set_next_service_id(next);
        Ok(())
    }
}

/// Logs the message at info level, optionally with its payload
#[derive(Debug, Default)]
pub struct LogMessageService {
    unique_id: String,
    log_prefix: String,
    include_payload: bool,
    lifecycle: LifecycleCell,
}

impl LogMessageService {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    pub fn with_payload(mut self, include_payload: bool) -> Self {
        self.include_payload = include_payload;
        self
    }
}

passive_component!(LogMessageService);

#[async_trait]
impl Service for LogMessageService {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()> {
        if self.include_payload {
            let content = msg
                .content()
                .unwrap_or_else(|_| String::from_utf8_lossy(msg.payload()).into_owned());
            info!(
                service_id = %self.unique_id,
                message_id = %msg.unique_id(),
                metadata_count = msg.metadata().len(),
                payload = %content,
                "{}",
                self.log_prefix
            );
        } else {
            info!(
                service_id = %self.unique_id,
                message_id = %msg.unique_id(),
                metadata_count = msg.metadata().len(),
                size = msg.size(),
                "{}",
                self.log_prefix
            );
        }
        Ok(())
    }
}

/// Does nothing
#[derive(Debug, Default)]
pub struct NullService {
    unique_id: String,
    lifecycle: LifecycleCell,
}

impl NullService {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            lifecycle: LifecycleCell::new(),
        }
    }
}

passive_component!(NullService);

#[async_trait]
impl Service for NullService {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    async fn do_service(&self, _msg: &mut Message) -> ServiceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{LifecycleState, StateManagedComponent};
    use crate::constants::metadata::WORKFLOW_SKIP_PRODUCER;
    use crate::message::{DefaultMessageFactory, MessageFactory};

    fn message_of(len: usize) -> Message {
        DefaultMessageFactory::new().new_message(vec![b'x'; len])
    }

    #[tokio::test]
    async fn test_stop_processing_sets_both_flags() {
        let service = StopProcessingService::new("stop");
        let mut msg = message_of(1);
        service.do_service(&mut msg).await.unwrap();
        assert!(msg.is_stop_processing());
        assert_eq!(msg.metadata_value(WORKFLOW_SKIP_PRODUCER), Some("true"));
    }

    #[tokio::test]
    async fn test_add_metadata_overwrites() {
        let service = AddMetadataService::new("add")
            .with_metadata("k", "one")
            .with_metadata("k", "two");
        let mut msg = message_of(1);
        service.do_service(&mut msg).await.unwrap();
        assert_eq!(msg.metadata_value("k"), Some("two"));
        assert_eq!(msg.metadata().len(), 1);
    }

    #[tokio::test]
    async fn test_throw_exception_reports_its_id() {
        let service = ThrowExceptionService::new("thrower", "configured failure");
        let err = service.do_service(&mut message_of(1)).await.unwrap_err();
        match err {
            ServiceError::Failed { service_id, reason } => {
                assert_eq!(service_id, "thrower");
                assert_eq!(reason, "configured failure");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_size_branching_boundaries() {
        let service = SizeBasedBranchingService::new("size", 10)
            .with_greater_than_service_id("big")
            .with_smaller_than_service_id("small");

        let mut larger = message_of(11);
        service.do_service(&mut larger).await.unwrap();
        assert_eq!(larger.next_service_id(), Some("big"));

        let mut equal = message_of(10);
        service.do_service(&mut equal).await.unwrap();
        assert_eq!(equal.next_service_id(), Some("small"));

        let mut smaller = message_of(2);
        service.do_service(&mut smaller).await.unwrap();
        assert_eq!(smaller.next_service_id(), Some("small"));
    }

    #[tokio::test]
    async fn test_size_branching_init_requires_both_ids() {
        let service = SizeBasedBranchingService::new("size", 10).with_greater_than_service_id("big");
        assert!(service.request_init().await.is_err());
        assert_eq!(service.state(), LifecycleState::Closed);
    }

    #[tokio::test]
    async fn test_log_and_null_services_leave_message_alone() {
        let mut msg = message_of(4);
        LogMessageService::new("log")
            .with_prefix("seen")
            .with_payload(true)
            .do_service(&mut msg)
            .await
            .unwrap();
        NullService::new("null").do_service(&mut msg).await.unwrap();
        assert_eq!(msg.payload(), b"xxxx");
        assert!(msg.metadata().is_empty());
    }
}
