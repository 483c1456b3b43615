//! # Component Lifecycle
//!
//! Uniform lifecycle state machine shared by every manageable unit: services,
//! connections, producers, pollers, workflows, channels and adapters.
//!
//! ```text
//! Closed --init--> Initialised --start--> Started --stop--> Stopped --close--> Closed
//! ```
//!
//! The state machine is a plain enum plus an explicit transition table
//! ([`plan_transition`]). Components implement the hooks in [`Component`] and
//! expose a [`LifecycleCell`]; the `request_*` methods of
//! [`StateManagedComponent`] run the table, invoke the hooks and advance the
//! state only when a hook succeeds.
//!
//! Parent/child gating for the runtime tree lives in [`ParentStateValidator`].

pub mod component;
pub mod parent;
pub mod state;

pub use component::{apply_request, Component, LifecycleCell, StateManagedComponent};
pub use parent::ParentStateValidator;
pub use state::{plan_transition, LifecycleRequest, LifecycleState};
