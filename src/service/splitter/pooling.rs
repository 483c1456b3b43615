//! # Pooled Parallel Split Processing
//!
//! [`PoolingSplitterService`] splits a message and hands every split message to
//! a bounded [`WorkerPool`]. Each task borrows a worker service from an
//! [`ObjectPool`], applies it and returns it through the pool guard. All
//! submissions run to completion before the first recorded failure is
//! surfaced. Completion order across split messages is not guaranteed.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::splitter::MessageSplitter;
use crate::config::SplitterConfig;
use crate::constants::defaults;
use crate::constants::markers::MESSAGE_SPLIT;
use crate::error::{service_failed, PoolError, PoolResult, Result, ServiceError, ServiceResult};
use crate::lifecycle::{Component, LifecycleCell};
use crate::message::{DefaultMessageFactory, Message, MessageFactory};
use crate::pool::{ExceptionCollector, ObjectPool, PooledObjectFactory, WorkerPool};
use crate::service::traits::{Service, ServiceFactory};

/// Pooled-object factory that brings each worker service to `Started` on
/// creation and closes it on disposal
pub struct ServiceWorkerFactory {
    factory: Arc<dyn ServiceFactory>,
}

impl ServiceWorkerFactory {
    pub fn new(factory: Arc<dyn ServiceFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl PooledObjectFactory<Arc<dyn Service>> for ServiceWorkerFactory {
    async fn create(&self) -> PoolResult<Arc<dyn Service>> {
        let service = self
            .factory
            .create()
            .map_err(|e| PoolError::Factory(e.to_string()))?;
        service
            .request_init()
            .await
            .map_err(|e| PoolError::Factory(e.to_string()))?;
        service
            .request_start()
            .await
            .map_err(|e| PoolError::Factory(e.to_string()))?;
        Ok(service)
    }

    async fn destroy(&self, service: Arc<dyn Service>) {
        if let Err(e) = service.request_close().await {
            warn!(
                service_id = %service.unique_id(),
                error = %e,
                "⚠️ Failed to close pooled worker service"
            );
        }
    }
}

struct SplitterPools {
    workers: Arc<WorkerPool>,
    services: ObjectPool<Arc<dyn Service>>,
}

/// Splits a message and processes the split messages in parallel
pub struct PoolingSplitterService {
    unique_id: String,
    continue_on_fail: bool,
    splitter: Arc<dyn MessageSplitter>,
    service_factory: Arc<dyn ServiceFactory>,
    message_factory: Arc<dyn MessageFactory>,
    max_threads: usize,
    borrow_timeout: Duration,
    shutdown_wait: Duration,
    pools: RwLock<Option<Arc<SplitterPools>>>,
    lifecycle: LifecycleCell,
}

impl PoolingSplitterService {
    pub fn new(
        unique_id: impl Into<String>,
        splitter: Arc<dyn MessageSplitter>,
        service_factory: Arc<dyn ServiceFactory>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            continue_on_fail: false,
            splitter,
            service_factory,
            message_factory: Arc::new(DefaultMessageFactory::new()),
            max_threads: defaults::SPLITTER_MAX_THREADS,
            borrow_timeout: defaults::POOL_BORROW_TIMEOUT,
            shutdown_wait: defaults::SHUTDOWN_WAIT,
            pools: RwLock::new(None),
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn with_config(mut self, config: &SplitterConfig) -> Self {
        self.max_threads = config.max_threads;
        self.borrow_timeout = config.borrow_timeout();
        self.shutdown_wait = config.shutdown_wait();
        self
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn with_borrow_timeout(mut self, timeout: Duration) -> Self {
        self.borrow_timeout = timeout;
        self
    }

    pub fn with_shutdown_wait(mut self, wait: Duration) -> Self {
        self.shutdown_wait = wait;
        self
    }

    pub fn with_message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.message_factory = factory;
        self
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    fn pools(&self) -> ServiceResult<Arc<SplitterPools>> {
        self.pools.read().clone().ok_or_else(|| {
            ServiceError::Configuration(format!(
                "pooling splitter {} has no worker pool; it must be initialised first",
                self.unique_id
            ))
        })
    }

    async fn apply_worker(services: ObjectPool<Arc<dyn Service>>, mut msg: Message) -> ServiceResult<()> {
        let worker = services.borrow().await?;
        worker.do_service(&mut msg).await
    }
}

#[async_trait]
impl Component for PoolingSplitterService {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn init(&self) -> Result<()> {
        let worker_factory = Arc::new(ServiceWorkerFactory::new(Arc::clone(&self.service_factory)));
        let pools = SplitterPools {
            workers: Arc::new(WorkerPool::new(
                format!("{}-workers", self.unique_id),
                self.max_threads,
                self.shutdown_wait,
            )),
            services: ObjectPool::new(
                format!("{}-services", self.unique_id),
                worker_factory,
                self.max_threads,
                self.borrow_timeout,
            ),
        };
        *self.pools.write() = Some(Arc::new(pools));
        info!(
            service_id = %self.unique_id,
            max_threads = self.max_threads,
            "🚀 Pooling splitter initialised"
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let pools = self.pools.write().take();
        if let Some(pools) = pools {
            pools.workers.shutdown().await;
            pools.services.close().await;
        }
        Ok(())
    }
}

crate::state_managed!(PoolingSplitterService);

#[async_trait]
impl Service for PoolingSplitterService {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()> {
        let pools = self.pools()?;
        let started = Instant::now();
        let split = self.splitter.split_message(msg, self.message_factory.as_ref())?;
        let submitted = split.len();
        let collector = Arc::new(ExceptionCollector::new());

        let mut handles = Vec::with_capacity(submitted);
        for child in split {
            let services = pools.services.clone();
            let collector_for_task = Arc::clone(&collector);
            let task = async move {
                if let Err(e) = Self::apply_worker(services, child).await {
                    collector_for_task.record(e);
                }
            };
            match pools.workers.submit(task) {
                Ok(handle) => handles.push(handle),
                Err(e) => collector.record(e.into()),
            }
        }

        for handle in handles {
            if let Err(join_error) = handle.await {
                collector.record(service_failed(
                    &self.unique_id,
                    format!("split worker did not complete: {join_error}"),
                ));
            }
        }

        let composite = collector.take_composite(submitted);
        msg.add_marker(MESSAGE_SPLIT, self.unique_id.as_str(), composite.is_none());
        debug!(
            service_id = %self.unique_id,
            count = submitted,
            duration_ms = started.elapsed().as_millis() as u64,
            "Processed split messages"
        );

        match composite {
            None => Ok(()),
            Some(composite) => {
                warn!(
                    service_id = %self.unique_id,
                    failed = composite.failed,
                    submitted = composite.submitted,
                    "⚠️ Split processing finished with failures"
                );
                Err(composite.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::StateManagedComponent;
    use crate::service::builtin::AddMetadataService;
    use crate::service::splitter::LineCountSplitter;

    fn splitter_service(max_threads: usize) -> PoolingSplitterService {
        let factory: Arc<dyn ServiceFactory> = Arc::new(|| -> ServiceResult<Arc<dyn Service>> {
            Ok(Arc::new(AddMetadataService::new("worker").with_metadata("seen", "true")))
        });
        PoolingSplitterService::new("pooled", Arc::new(LineCountSplitter::new(1)), factory)
            .with_max_threads(max_threads)
            .with_shutdown_wait(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_requires_init_before_use() {
        let service = splitter_service(2);
        let mut msg = DefaultMessageFactory::new().new_string_message("a\nb").unwrap();
        let err = service.do_service(&mut msg).await.unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_all_split_messages_processed() {
        let service = splitter_service(2);
        service.request_init().await.unwrap();
        service.request_start().await.unwrap();

        let mut msg = DefaultMessageFactory::new().new_string_message("a\nb\nc").unwrap();
        service.do_service(&mut msg).await.unwrap();
        assert!(msg.markers().last().unwrap().success);

        service.request_close().await.unwrap();
        assert!(service.pools.read().is_none());
    }
}
