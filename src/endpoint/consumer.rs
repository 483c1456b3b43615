use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;
use crate::message::Message;

/// Consumer driven by a poller
///
/// The poller calls `attempt_lock` before every poll and skips the poll when
/// it returns `false`; `release_lock` is always called after a locked poll.
#[async_trait]
pub trait PollingConsumer: Send + Sync {
    fn consumer_id(&self) -> &str;

    /// Non-blocking, non-reentrant attempt to take the consumer's poll lock
    fn attempt_lock(&self) -> bool;

    fn release_lock(&self);

    /// Process whatever is available; returns the number of messages handled
    async fn process_messages(&self) -> Result<usize>;

    /// Called when `process_messages` fails or panics
    async fn handle_connection_exception(&self) {}
}

/// Receives messages pushed by an inbound endpoint
#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_message(&self, msg: Message) -> Result<()>;
}

/// What a consumer declares about how it delivers messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerCapabilities {
    /// The consumer holds its request open until the workflow has finished
    /// with the message (request/reply endpoints)
    pub awaits_completion: bool,
}

impl ConsumerCapabilities {
    pub fn awaiting_completion() -> Self {
        Self {
            awaits_completion: true,
        }
    }
}

/// Exclusive, non-reentrant, non-blocking advisory lock
///
/// A second `try_lock` while held fails, even from the same task.
#[derive(Debug, Default)]
pub struct ConsumerLock {
    held: AtomicBool,
}

impl ConsumerLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_lock(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_and_not_reentrant() {
        let lock = ConsumerLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        assert!(lock.is_locked());
        lock.release();
        assert!(lock.try_lock());
    }
}
