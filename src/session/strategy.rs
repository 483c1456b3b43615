//! Session replacement policies.
//!
//! A strategy only decides whether the current session must be replaced
//! before the next message is produced; opening a session when none exists is
//! the session manager's job. Callers ask [`ProducerSessionFactory::new_session_required`]
//! first, report a replacement with `session_created` and then record the use
//! with `session_used`.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::message::Message;

/// Policy deciding when a producer session must be replaced
pub trait ProducerSessionFactory: Send + Sync + fmt::Debug {
    fn new_session_required(&self, msg: Option<&Message>) -> bool;

    /// A new session has just been opened
    fn session_created(&self) {}

    /// The current session is about to be used for `msg`
    fn session_used(&self, _msg: &Message) {}
}

/// Reuses one session for as long as it exists
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProducerSessionFactory;

impl ProducerSessionFactory for DefaultProducerSessionFactory {
    fn new_session_required(&self, _msg: Option<&Message>) -> bool {
        false
    }
}

/// Opens a new session for every message
#[derive(Debug, Default, Clone, Copy)]
pub struct PerMessageProducerSessionFactory;

impl ProducerSessionFactory for PerMessageProducerSessionFactory {
    fn new_session_required(&self, _msg: Option<&Message>) -> bool {
        true
    }
}

/// Replaces the session once it has been idle for longer than the interval
#[derive(Debug)]
pub struct TimedInactivityProducerSessionFactory {
    max_idle: Duration,
    last_used: Mutex<Option<Instant>>,
}

impl TimedInactivityProducerSessionFactory {
    pub fn new(max_idle: Duration) -> Self {
        Self {
            max_idle,
            last_used: Mutex::new(None),
        }
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }
}

impl ProducerSessionFactory for TimedInactivityProducerSessionFactory {
    fn new_session_required(&self, _msg: Option<&Message>) -> bool {
        self.last_used
            .lock()
            .is_some_and(|last| last.elapsed() > self.max_idle)
    }

    fn session_created(&self) {
        *self.last_used.lock() = Some(Instant::now());
    }

    fn session_used(&self, _msg: &Message) {
        *self.last_used.lock() = Some(Instant::now());
    }
}

/// Replaces the session once `max_messages` messages have used it
#[derive(Debug)]
pub struct MessageCountProducerSessionFactory {
    max_messages: usize,
    used: AtomicUsize,
}

impl MessageCountProducerSessionFactory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            used: AtomicUsize::new(0),
        }
    }

    pub fn messages_in_session(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}

impl ProducerSessionFactory for MessageCountProducerSessionFactory {
    fn new_session_required(&self, _msg: Option<&Message>) -> bool {
        self.used.load(Ordering::Acquire) >= self.max_messages
    }

    fn session_created(&self) {
        self.used.store(0, Ordering::Release);
    }

    fn session_used(&self, _msg: &Message) {
        self.used.fetch_add(1, Ordering::AcqRel);
    }
}

/// Replaces the session once the cumulative payload size reaches the maximum
#[derive(Debug)]
pub struct MessageSizeProducerSessionFactory {
    max_bytes: u64,
    produced_bytes: AtomicU64,
}

impl MessageSizeProducerSessionFactory {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            produced_bytes: AtomicU64::new(0),
        }
    }

    pub fn bytes_in_session(&self) -> u64 {
        self.produced_bytes.load(Ordering::Acquire)
    }
}

impl ProducerSessionFactory for MessageSizeProducerSessionFactory {
    fn new_session_required(&self, _msg: Option<&Message>) -> bool {
        self.produced_bytes.load(Ordering::Acquire) >= self.max_bytes
    }

    fn session_created(&self) {
        self.produced_bytes.store(0, Ordering::Release);
    }

    fn session_used(&self, msg: &Message) {
        self.produced_bytes.fetch_add(msg.size() as u64, Ordering::AcqRel);
    }
}

/// Replaces the session when the message carries `key` set to `true`
/// (case-insensitive)
#[derive(Debug, Clone)]
pub struct MetadataProducerSessionFactory {
    metadata_key: String,
}

impl MetadataProducerSessionFactory {
    pub fn new(metadata_key: impl Into<String>) -> Self {
        Self {
            metadata_key: metadata_key.into(),
        }
    }
}

impl ProducerSessionFactory for MetadataProducerSessionFactory {
    fn new_session_required(&self, msg: Option<&Message>) -> bool {
        msg.and_then(|m| m.metadata_value(&self.metadata_key))
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DefaultMessageFactory, MessageFactory};

    fn message(len: usize) -> Message {
        DefaultMessageFactory::new().new_message(vec![0u8; len])
    }

    /// Ask, then record the use, the way a session manager does
    fn check_and_use(strategy: &dyn ProducerSessionFactory, msg: &Message) -> bool {
        let required = strategy.new_session_required(Some(msg));
        if required {
            strategy.session_created();
        }
        strategy.session_used(msg);
        required
    }

    #[test]
    fn test_message_count_boundary() {
        let strategy = MessageCountProducerSessionFactory::new(2);
        let msg = message(1);
        assert!(!check_and_use(&strategy, &msg));
        assert!(!check_and_use(&strategy, &msg));
        assert!(check_and_use(&strategy, &msg));
        assert_eq!(strategy.messages_in_session(), 1);
    }

    #[test]
    fn test_message_size_accumulates() {
        let strategy = MessageSizeProducerSessionFactory::new(10);
        assert!(!check_and_use(&strategy, &message(6)));
        assert!(!check_and_use(&strategy, &message(4)));
        assert!(check_and_use(&strategy, &message(1)));
        assert_eq!(strategy.bytes_in_session(), 1);
    }

    #[test]
    fn test_metadata_flag_is_case_insensitive() {
        let strategy = MetadataProducerSessionFactory::new("renew");
        let mut msg = message(1);
        assert!(!strategy.new_session_required(Some(&msg)));
        msg.add_metadata("renew", "TRUE");
        assert!(strategy.new_session_required(Some(&msg)));
        msg.add_metadata("renew", "no");
        assert!(!strategy.new_session_required(Some(&msg)));
        assert!(!strategy.new_session_required(None));
    }

    #[test]
    fn test_timed_inactivity_expires() {
        let strategy = TimedInactivityProducerSessionFactory::new(Duration::from_millis(10));
        assert!(!strategy.new_session_required(None));
        strategy.session_created();
        assert!(!strategy.new_session_required(None));
        std::thread::sleep(Duration::from_millis(25));
        assert!(strategy.new_session_required(None));
    }

    #[test]
    fn test_default_and_per_message() {
        let msg = message(1);
        assert!(!check_and_use(&DefaultProducerSessionFactory, &msg));
        assert!(!check_and_use(&DefaultProducerSessionFactory, &msg));
        assert!(check_and_use(&PerMessageProducerSessionFactory, &msg));
        assert!(check_and_use(&PerMessageProducerSessionFactory, &msg));
    }
}
