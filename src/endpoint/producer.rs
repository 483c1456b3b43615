use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{produce_failed, ProduceResult, Result};
use crate::lifecycle::{Component, LifecycleCell, StateManagedComponent};
use crate::message::Message;
use crate::session::SessionManager;

/// Outbound endpoint of a workflow
#[async_trait]
pub trait Producer: StateManagedComponent {
    async fn produce(&self, msg: &Message) -> ProduceResult<()>;
}

/// Discards every message
#[derive(Debug)]
pub struct NullProducer {
    unique_id: String,
    lifecycle: LifecycleCell,
}

impl NullProducer {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            lifecycle: LifecycleCell::new(),
        }
    }
}

impl Default for NullProducer {
    fn default() -> Self {
        Self::new("null-producer")
    }
}

#[async_trait]
impl Component for NullProducer {
    fn component_id(&self) -> &str {
        &self.unique_id
    }
}

crate::state_managed!(NullProducer);

#[async_trait]
impl Producer for NullProducer {
    async fn produce(&self, _msg: &Message) -> ProduceResult<()> {
        Ok(())
    }
}

/// Keeps a copy of every produced message; can be told to fail
#[derive(Debug)]
pub struct CapturingProducer {
    unique_id: String,
    produced: Mutex<Vec<Message>>,
    failure: Mutex<Option<String>>,
    attempts: AtomicUsize,
    lifecycle: LifecycleCell,
}

impl CapturingProducer {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            produced: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            attempts: AtomicUsize::new(0),
            lifecycle: LifecycleCell::new(),
        }
    }

    /// Fail every subsequent produce with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    pub fn succeed(&self) {
        *self.failure.lock() = None;
    }

    pub fn produced(&self) -> Vec<Message> {
        self.produced.lock().clone()
    }

    pub fn produced_count(&self) -> usize {
        self.produced.lock().len()
    }

    /// Produce calls, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.produced.lock().clear();
    }
}

#[async_trait]
impl Component for CapturingProducer {
    fn component_id(&self) -> &str {
        &self.unique_id
    }
}

crate::state_managed!(CapturingProducer);

#[async_trait]
impl Producer for CapturingProducer {
    async fn produce(&self, msg: &Message) -> ProduceResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.lock().clone();
        if let Some(reason) = failure {
            return Err(produce_failed(&self.unique_id, reason));
        }
        self.produced.lock().push(msg.clone());
        Ok(())
    }
}

/// Sends one message over an open session
#[async_trait]
pub trait SessionSender<S: Send>: Send + Sync {
    async fn send(&self, session: &mut S, msg: &Message) -> ProduceResult<()>;
}

/// Producer that sends through a [`SessionManager`], replacing the session as
/// its strategy dictates
pub struct SessionProducer<S: Send + 'static> {
    unique_id: String,
    sessions: SessionManager<S>,
    sender: Arc<dyn SessionSender<S>>,
    lifecycle: LifecycleCell,
}

impl<S: Send + 'static> SessionProducer<S> {
    pub fn new(unique_id: impl Into<String>, sessions: SessionManager<S>, sender: Arc<dyn SessionSender<S>>) -> Self {
        Self {
            unique_id: unique_id.into(),
            sessions,
            sender,
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }
}

#[async_trait]
impl<S: Send + 'static> Component for SessionProducer<S> {
    fn component_id(&self) -> &str {
        &self.unique_id
    }

    async fn stop(&self) -> Result<()> {
        self.sessions.close().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.sessions.close().await?;
        Ok(())
    }
}

impl<S: Send + 'static> StateManagedComponent for SessionProducer<S> {
    fn lifecycle(&self) -> &LifecycleCell {
        &self.lifecycle
    }
}

#[async_trait]
impl<S: Send + 'static> Producer for SessionProducer<S> {
    async fn produce(&self, msg: &Message) -> ProduceResult<()> {
        let mut session = self.sessions.session_for(msg).await?;
        self.sender.send(&mut *session, msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DefaultMessageFactory, MessageFactory};
    use crate::session::{PerMessageProducerSessionFactory, SessionProvider};

    #[tokio::test]
    async fn test_capturing_producer_records_and_fails_on_demand() {
        let producer = CapturingProducer::new("out");
        let msg = DefaultMessageFactory::new().new_message(b"hello".to_vec());

        producer.produce(&msg).await.unwrap();
        producer.fail_with("offline");
        assert!(producer.produce(&msg).await.is_err());

        assert_eq!(producer.produced_count(), 1);
        assert_eq!(producer.attempts(), 2);
        assert_eq!(producer.produced()[0].unique_id(), msg.unique_id());
    }

    struct Counter(AtomicUsize);

    #[async_trait]
    impl SessionProvider<Vec<String>> for Counter {
        async fn open_session(&self) -> ProduceResult<Vec<String>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn close_session(&self, _session: Vec<String>) -> ProduceResult<()> {
            Ok(())
        }
    }

    struct Appender;

    #[async_trait]
    impl SessionSender<Vec<String>> for Appender {
        async fn send(&self, session: &mut Vec<String>, msg: &Message) -> ProduceResult<()> {
            session.push(msg.unique_id().to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_producer_follows_strategy() {
        let provider = Arc::new(Counter(AtomicUsize::new(0)));
        let sessions = SessionManager::new(
            "out",
            provider.clone(),
            Arc::new(PerMessageProducerSessionFactory),
        );
        let producer = SessionProducer::new("out", sessions, Arc::new(Appender));
        let factory = DefaultMessageFactory::new();

        for _ in 0..3 {
            producer.produce(&factory.new_message(Vec::new())).await.unwrap();
        }
        assert_eq!(provider.0.load(Ordering::SeqCst), 3);

        producer.request_init().await.unwrap();
        producer.request_close().await.unwrap();
        assert!(!producer.sessions().has_session().await);
    }
}
