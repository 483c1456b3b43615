use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a manageable component
///
/// `Closed` is both the initial and the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Not initialised, holds no resources
    #[default]
    Closed,
    /// Resources acquired, not yet processing
    Initialised,
    /// Processing messages
    Started,
    /// Processing halted, resources still held
    Stopped,
}

impl LifecycleState {
    /// Check if the component is actively processing
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// Check if the component holds no resources
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Ordering used when comparing a child's state against its parent's
    pub fn rank(&self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Initialised => 1,
            Self::Stopped => 2,
            Self::Started => 3,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Initialised => write!(f, "initialised"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Self::Closed),
            "initialised" => Ok(Self::Initialised),
            "started" => Ok(Self::Started),
            "stopped" => Ok(Self::Stopped),
            _ => Err(format!("Invalid lifecycle state: {s}")),
        }
    }
}

/// A request made against a component's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleRequest {
    Init,
    Start,
    Stop,
    Close,
}

impl LifecycleRequest {
    /// State reached once the hook for this request has succeeded
    pub fn target_state(&self) -> LifecycleState {
        match self {
            Self::Init => LifecycleState::Initialised,
            Self::Start => LifecycleState::Started,
            Self::Stop => LifecycleState::Stopped,
            Self::Close => LifecycleState::Closed,
        }
    }

    /// Requests that move a component towards a more active state
    pub fn is_activating(&self) -> bool {
        matches!(self, Self::Init | Self::Start)
    }
}

impl fmt::Display for LifecycleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Close => write!(f, "close"),
        }
    }
}

const NO_HOOKS: &[LifecycleRequest] = &[];
const INIT: &[LifecycleRequest] = &[LifecycleRequest::Init];
const START: &[LifecycleRequest] = &[LifecycleRequest::Start];
const STOP: &[LifecycleRequest] = &[LifecycleRequest::Stop];
const CLOSE: &[LifecycleRequest] = &[LifecycleRequest::Close];
const STOP_THEN_CLOSE: &[LifecycleRequest] = &[LifecycleRequest::Stop, LifecycleRequest::Close];

/// Transition table: the hooks to run for `request` made in `current`
///
/// Returns `None` for an illegal request; an empty slice is a documented no-op.
pub fn plan_transition(
    current: LifecycleState,
    request: LifecycleRequest,
) -> Option<&'static [LifecycleRequest]> {
    use LifecycleRequest as R;
    use LifecycleState as S;

    match (current, request) {
        (S::Closed, R::Init) => Some(INIT),
        (S::Closed, R::Start) => None,
        (S::Closed, R::Stop | R::Close) => Some(NO_HOOKS),

        (S::Initialised, R::Init | R::Stop) => Some(NO_HOOKS),
        (S::Initialised, R::Start) => Some(START),
        (S::Initialised, R::Close) => Some(CLOSE),

        (S::Started, R::Init | R::Start) => Some(NO_HOOKS),
        (S::Started, R::Stop) => Some(STOP),
        (S::Started, R::Close) => Some(STOP_THEN_CLOSE),

        (S::Stopped, R::Init | R::Stop) => Some(NO_HOOKS),
        (S::Stopped, R::Start) => Some(START),
        (S::Stopped, R::Close) => Some(CLOSE),
    }
}
