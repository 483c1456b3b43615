use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::strategy::ProducerSessionFactory;
use crate::error::{ProduceError, ProduceResult};
use crate::message::Message;

/// Opens and closes sessions on an external resource
#[async_trait]
pub trait SessionProvider<S: Send>: Send + Sync {
    async fn open_session(&self) -> ProduceResult<S>;
    async fn close_session(&self, session: S) -> ProduceResult<()>;
}

/// Owns the current session of a producer and replaces it per strategy
///
/// The replacement (close old, open new) happens under the same lock that
/// hands the session out, so no caller ever observes a session the strategy
/// has already retired.
pub struct SessionManager<S: Send + 'static> {
    name: String,
    provider: Arc<dyn SessionProvider<S>>,
    strategy: Arc<dyn ProducerSessionFactory>,
    current: Mutex<Option<S>>,
    opened: AtomicUsize,
}

impl<S: Send + 'static> SessionManager<S> {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn SessionProvider<S>>,
        strategy: Arc<dyn ProducerSessionFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            strategy,
            current: Mutex::new(None),
            opened: AtomicUsize::new(0),
        }
    }

    /// Session to produce `msg` with, replaced first if the strategy asks
    ///
    /// The session stays locked to the caller until the guard drops.
    pub async fn session_for(&self, msg: &Message) -> ProduceResult<MappedMutexGuard<'_, S>> {
        let mut current = self.current.lock().await;

        let replace = current.is_some() && self.strategy.new_session_required(Some(msg));
        if replace {
            if let Some(old) = current.take() {
                debug!(manager = %self.name, message_id = %msg.unique_id(), "Replacing producer session");
                if let Err(e) = self.provider.close_session(old).await {
                    warn!(manager = %self.name, error = %e, "⚠️ Failed to close retired session");
                }
            }
        }

        if current.is_none() {
            *current = Some(self.provider.open_session().await?);
            self.strategy.session_created();
            self.opened.fetch_add(1, Ordering::Relaxed);
        }
        self.strategy.session_used(msg);

        MutexGuard::try_map(current, |session| session.as_mut())
            .map_err(|_| ProduceError::Session(format!("{}: no session available", self.name)))
    }

    /// Close the current session, if any
    pub async fn close(&self) -> ProduceResult<()> {
        let session = self.current.lock().await.take();
        match session {
            Some(session) => self.provider.close_session(session).await,
            None => Ok(()),
        }
    }

    pub async fn has_session(&self) -> bool {
        self.current.lock().await.is_some()
    }

    /// Sessions opened over the manager's lifetime
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}
