//! # Pooling
//!
//! Building blocks for pooled parallel processing: a bounded [`WorkerPool`]
//! executor, an [`ObjectPool`] of reusable workers with drop-guard return, and
//! the [`ExceptionCollector`] shared by workers.

pub mod exception_collector;
pub mod object_pool;
pub mod worker_pool;

pub use exception_collector::ExceptionCollector;
pub use object_pool::{ObjectPool, PooledObject, PooledObjectFactory};
pub use worker_pool::WorkerPool;
