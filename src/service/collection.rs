//! # Service Collections
//!
//! Composite services that apply an ordered list of child services under a
//! composition policy:
//!
//! - **Sequential**: children run in configured order on the same message.
//! - **Branching**: after each child the message's next service id selects the
//!   child to jump to; an unset id continues in order.
//! - **Cloning**: each child works on its own clone of the message, so the
//!   original is never modified by the children.
//!
//! In every policy a failing child with `continue_on_fail` is logged and
//! skipped; otherwise the collection aborts and returns the failure.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::traits::Service;
use crate::constants::markers::SERVICE_APPLIED;
use crate::error::{Result, ServiceError, ServiceResult};
use crate::lifecycle::{Component, LifecycleCell};
use crate::message::Message;

/// How a collection applies its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionPolicy {
    Sequential,
    Branching { first_service_id: Option<String> },
    Cloning,
}

impl CompositionPolicy {
    fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Branching { .. } => "branching",
            Self::Cloning => "cloning",
        }
    }
}

/// An ordered list of services applied under a [`CompositionPolicy`]
pub struct ServiceCollection {
    unique_id: String,
    continue_on_fail: bool,
    policy: CompositionPolicy,
    services: Vec<Arc<dyn Service>>,
    lifecycle: LifecycleCell,
}

impl ServiceCollection {
    pub fn new(unique_id: impl Into<String>, policy: CompositionPolicy) -> Self {
        Self {
            unique_id: unique_id.into(),
            continue_on_fail: false,
            policy,
            services: Vec::new(),
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn sequential(unique_id: impl Into<String>) -> Self {
        Self::new(unique_id, CompositionPolicy::Sequential)
    }

    pub fn branching(unique_id: impl Into<String>, first_service_id: Option<String>) -> Self {
        Self::new(unique_id, CompositionPolicy::Branching { first_service_id })
    }

    pub fn cloning(unique_id: impl Into<String>) -> Self {
        Self::new(unique_id, CompositionPolicy::Cloning)
    }

    pub fn with_service(mut self, service: Arc<dyn Service>) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    pub fn add_service(&mut self, service: Arc<dyn Service>) {
        self.services.push(service);
    }

    pub fn policy(&self) -> &CompositionPolicy {
        &self.policy
    }

    pub fn services(&self) -> &[Arc<dyn Service>] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn position_of(&self, service_id: &str) -> Option<usize> {
        self.services
            .iter()
            .position(|service| service.unique_id() == service_id)
    }

    fn validate(&self) -> ServiceResult<()> {
        if let CompositionPolicy::Branching { first_service_id } = &self.policy {
            let mut seen = HashSet::new();
            for service in &self.services {
                if !seen.insert(service.unique_id()) {
                    return Err(ServiceError::Configuration(format!(
                        "branching collection {} has duplicate service id {}",
                        self.unique_id,
                        service.unique_id()
                    )));
                }
            }
            if let Some(first) = first_service_id {
                if self.position_of(first).is_none() {
                    return Err(ServiceError::Configuration(format!(
                        "branching collection {} has no first service {first}",
                        self.unique_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Run one child, applying its continue-on-fail policy to a failure
    async fn apply_child(&self, service: &Arc<dyn Service>, msg: &mut Message) -> ServiceResult<()> {
        match service.do_service(msg).await {
            Ok(()) => {
                msg.add_marker(SERVICE_APPLIED, service.unique_id(), true);
                debug!(
                    collection = %self.unique_id,
                    service_id = %service.unique_id(),
                    message_id = %msg.unique_id(),
                    "Service applied"
                );
                Ok(())
            }
            Err(err) => {
                msg.add_marker(SERVICE_APPLIED, service.unique_id(), false);
                self.handle_failure(service, err)
            }
        }
    }

    fn handle_failure(&self, service: &Arc<dyn Service>, err: ServiceError) -> ServiceResult<()> {
        if service.continue_on_fail() {
            warn!(
                collection = %self.unique_id,
                service_id = %service.unique_id(),
                error = %err,
                "⚠️ Service failed, continue-on-fail set; carrying on"
            );
            Ok(())
        } else {
            Err(err)
        }
    }

    async fn apply_sequential(&self, msg: &mut Message) -> ServiceResult<()> {
        for service in &self.services {
            self.apply_child(service, msg).await?;
            if msg.is_stop_processing() {
                info!(
                    collection = %self.unique_id,
                    service_id = %service.unique_id(),
                    "🛑 Stop processing requested, skipping remaining services"
                );
                break;
            }
        }
        Ok(())
    }

    async fn apply_branching(&self, msg: &mut Message, first_service_id: Option<&str>) -> ServiceResult<()> {
        let mut index = match first_service_id {
            Some(first) => self.position_of(first).ok_or_else(|| {
                ServiceError::Configuration(format!(
                    "branching collection {} has no first service {first}",
                    self.unique_id
                ))
            })?,
            None => 0,
        };

        while let Some(service) = self.services.get(index) {
            self.apply_child(service, msg).await?;
            if msg.is_stop_processing() {
                info!(
                    collection = %self.unique_id,
                    service_id = %service.unique_id(),
                    "🛑 Stop processing requested, leaving branch"
                );
                break;
            }
            index = match msg.take_next_service_id() {
                Some(next) => {
                    let target = self.position_of(&next).ok_or_else(|| {
                        ServiceError::Configuration(format!(
                            "branching collection {} has no service with id {next}",
                            self.unique_id
                        ))
                    })?;
                    debug!(
                        collection = %self.unique_id,
                        from = %service.unique_id(),
                        to = %next,
                        "Branching to service"
                    );
                    target
                }
                None => index + 1,
            };
        }
        Ok(())
    }

    async fn apply_cloning(&self, msg: &Message) -> ServiceResult<()> {
        for service in &self.services {
            let mut clone = msg.clone();
            self.apply_child(service, &mut clone).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Component for ServiceCollection {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn init(&self) -> Result<()> {
        self.validate()?;
        for service in &self.services {
            service.request_init().await?;
        }
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        for service in &self.services {
            service.request_start().await?;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        for service in self.services.iter().rev() {
            service.request_stop().await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        for service in self.services.iter().rev() {
            service.request_close().await?;
        }
        Ok(())
    }
}

crate::state_managed!(ServiceCollection);

#[async_trait]
impl Service for ServiceCollection {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()> {
        debug!(
            collection = %self.unique_id,
            policy = self.policy.name(),
            services = self.services.len(),
            "Applying service collection"
        );
        match &self.policy {
            CompositionPolicy::Sequential => self.apply_sequential(msg).await,
            CompositionPolicy::Branching { first_service_id } => {
                self.apply_branching(msg, first_service_id.as_deref()).await
            }
            CompositionPolicy::Cloning => self.apply_cloning(msg).await,
        }
    }
}
