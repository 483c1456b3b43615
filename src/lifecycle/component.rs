use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::state::{plan_transition, LifecycleRequest, LifecycleState};
use crate::error::{LifecycleError, LifecycleResult, Result};

/// Lifecycle hooks of a manageable unit
///
/// Hooks are invoked by the state machine only; callers use the
/// `request_*` methods of [`StateManagedComponent`].
#[async_trait]
pub trait Component: Send + Sync {
    /// Identifier used in logs and error messages
    fn component_id(&self) -> &str;

    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Per-instance lifecycle state store
///
/// The async transition lock serializes requests on one component so that a
/// hook and the state update it gates are never interleaved with another
/// request.
#[derive(Debug, Default)]
pub struct LifecycleCell {
    state: RwLock<CellState>,
    transition_lock: tokio::sync::Mutex<()>,
}

#[derive(Debug, Default, Clone, Copy)]
struct CellState {
    current: LifecycleState,
    last_started_at: Option<DateTime<Utc>>,
    last_stopped_at: Option<DateTime<Utc>>,
}

impl LifecycleCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> LifecycleState {
        self.state.read().current
    }

    pub fn last_started_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_started_at
    }

    pub fn last_stopped_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_stopped_at
    }

    fn advance(&self, reached: LifecycleState) {
        let mut state = self.state.write();
        match reached {
            LifecycleState::Started => state.last_started_at = Some(Utc::now()),
            LifecycleState::Stopped => state.last_stopped_at = Some(Utc::now()),
            _ => {}
        }
        state.current = reached;
    }
}

/// A component whose state is governed by the lifecycle transition table
#[async_trait]
pub trait StateManagedComponent: Component {
    fn lifecycle(&self) -> &LifecycleCell;

    fn state(&self) -> LifecycleState {
        self.lifecycle().current()
    }

    async fn request_init(&self) -> LifecycleResult<()> {
        apply_request(self, LifecycleRequest::Init).await
    }

    async fn request_start(&self) -> LifecycleResult<()> {
        apply_request(self, LifecycleRequest::Start).await
    }

    async fn request_stop(&self) -> LifecycleResult<()> {
        apply_request(self, LifecycleRequest::Stop).await
    }

    async fn request_close(&self) -> LifecycleResult<()> {
        apply_request(self, LifecycleRequest::Close).await
    }
}

/// Run `request` against `component` using the transition table
///
/// Each hook that succeeds advances the stored state; a failing hook leaves
/// the state at the last one reached and its error is returned.
pub async fn apply_request<C>(component: &C, request: LifecycleRequest) -> LifecycleResult<()>
where
    C: StateManagedComponent + ?Sized,
{
    let cell = component.lifecycle();
    let _transition = cell.transition_lock.lock().await;
    let current = cell.current();

    let hooks = plan_transition(current, request).ok_or_else(|| {
        LifecycleError::InvalidTransition {
            component: component.component_id().to_string(),
            from: current,
            request,
        }
    })?;

    if hooks.is_empty() {
        trace!(
            component = %component.component_id(),
            state = %current,
            request = %request,
            "Lifecycle request is a no-op in current state"
        );
        return Ok(());
    }

    for hook in hooks {
        let outcome = match hook {
            LifecycleRequest::Init => component.init().await,
            LifecycleRequest::Start => component.start().await,
            LifecycleRequest::Stop => component.stop().await,
            LifecycleRequest::Close => component.close().await,
        };

        if let Err(err) = outcome {
            warn!(
                component = %component.component_id(),
                hook = %hook,
                state = %cell.current(),
                error = %err,
                "⚠️ Lifecycle hook failed, state left unchanged"
            );
            return Err(LifecycleError::HookFailed {
                component: component.component_id().to_string(),
                hook: *hook,
                source: Box::new(err),
            });
        }

        cell.advance(hook.target_state());
        debug!(
            component = %component.component_id(),
            state = %hook.target_state(),
            "Lifecycle transition complete"
        );
    }

    Ok(())
}
