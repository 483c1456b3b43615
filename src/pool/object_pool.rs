//! # Object Pool
//!
//! A bounded pool of reusable objects. Borrowing waits (bounded) for a free
//! slot; a borrowed object travels in a [`PooledObject`] guard that hands it
//! back to the pool when dropped, whatever happened while it was out.

use async_trait::async_trait;
use crossbeam::queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{PoolError, PoolResult};

/// Creates and disposes of pooled objects
#[async_trait]
pub trait PooledObjectFactory<T: Send + 'static>: Send + Sync {
    async fn create(&self) -> PoolResult<T>;

    /// Called for objects discarded when the pool is closed
    async fn destroy(&self, _object: T) {}
}

struct PoolInner<T: Send + 'static> {
    name: String,
    idle: ArrayQueue<T>,
    permits: Arc<Semaphore>,
    factory: Arc<dyn PooledObjectFactory<T>>,
    max_size: usize,
    borrow_timeout: Duration,
    closed: AtomicBool,
    created: AtomicUsize,
}

/// Bounded pool of reusable objects
pub struct ObjectPool<T: Send + 'static> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Send + 'static> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> ObjectPool<T> {
    pub fn new(
        name: impl Into<String>,
        factory: Arc<dyn PooledObjectFactory<T>>,
        max_size: usize,
        borrow_timeout: Duration,
    ) -> Self {
        let max_size = max_size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                name: name.into(),
                idle: ArrayQueue::new(max_size),
                permits: Arc::new(Semaphore::new(max_size)),
                factory,
                max_size,
                borrow_timeout,
                closed: AtomicBool::new(false),
                created: AtomicUsize::new(0),
            }),
        }
    }

    /// Borrow an idle object, creating one if none is idle
    ///
    /// Waits up to the borrow timeout for a slot; fails with
    /// [`PoolError::Exhausted`] when the wait expires.
    pub async fn borrow(&self) -> PoolResult<PooledObject<T>> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let acquire = Arc::clone(&self.inner.permits).acquire_owned();
        let permit = match tokio::time::timeout(self.inner.borrow_timeout, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                warn!(
                    pool = %self.inner.name,
                    waited_ms = self.inner.borrow_timeout.as_millis() as u64,
                    "⚠️ Timed out waiting for a pooled object"
                );
                return Err(PoolError::Exhausted {
                    waited_ms: self.inner.borrow_timeout.as_millis() as u64,
                });
            }
        };

        let object = match self.inner.idle.pop() {
            Some(object) => object,
            None => {
                let object = self.inner.factory.create().await?;
                let created = self.inner.created.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(pool = %self.inner.name, created = created, "Created pooled object");
                object
            }
        };

        Ok(PooledObject {
            object: Some(object),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Reject further borrows and destroy idle objects
    ///
    /// Objects still borrowed are destroyed as their guards drop.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.permits.close();
        let mut destroyed = 0usize;
        while let Some(object) = self.inner.idle.pop() {
            self.inner.factory.destroy(object).await;
            destroyed += 1;
        }
        info!(pool = %self.inner.name, destroyed = destroyed, "🛑 Object pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle.len()
    }

    /// Objects currently borrowed
    pub fn active_count(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.inner.max_size - self.inner.permits.available_permits()
    }

    /// Objects created over the pool's lifetime
    pub fn created_count(&self) -> usize {
        self.inner.created.load(Ordering::Relaxed)
    }
}

/// Borrowed object; returned to its pool on drop
pub struct PooledObject<T: Send + 'static> {
    object: Option<T>,
    pool: Arc<PoolInner<T>>,
    _permit: OwnedSemaphorePermit,
}

impl<T: Send + 'static> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only taken in Drop
        self.object.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Send + 'static> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.object.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Send + 'static> Drop for PooledObject<T> {
    fn drop(&mut self) {
        let Some(object) = self.object.take() else {
            return;
        };
        if !self.pool.closed.load(Ordering::Acquire) {
            // Capacity equals the permit count, so a returned object always fits
            if self.pool.idle.push(object).is_err() {
                warn!(pool = %self.pool.name, "Idle queue full, dropping returned object");
            }
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let factory = Arc::clone(&self.pool.factory);
            handle.spawn(async move {
                factory.destroy(object).await;
            });
        }
    }
}
