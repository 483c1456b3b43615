use super::state::{LifecycleRequest, LifecycleState};
use crate::error::{LifecycleError, LifecycleResult};

/// Validates a child's lifecycle request against its parent's current state
///
/// Only `init` and `start` are gated: a child may not become more active than
/// its parent. `stop` and `close` are always allowed so that children can be
/// shut down before their parent.
pub struct ParentStateValidator;

impl ParentStateValidator {
    pub fn check_transition(
        component: &str,
        request: LifecycleRequest,
        parent_state: LifecycleState,
    ) -> LifecycleResult<()> {
        if Self::permits(request, parent_state) {
            return Ok(());
        }
        Err(LifecycleError::ParentState {
            component: component.to_string(),
            request,
            parent_state,
        })
    }

    /// Whether a parent in `parent_state` allows a child to make `request`
    pub fn permits(request: LifecycleRequest, parent_state: LifecycleState) -> bool {
        match request {
            LifecycleRequest::Init => !parent_state.is_closed(),
            LifecycleRequest::Start => parent_state.is_active(),
            LifecycleRequest::Stop | LifecycleRequest::Close => true,
        }
    }
}
