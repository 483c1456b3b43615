//! # Poller
//!
//! Scheduled, mutually exclusive driving of polling consumers.

pub mod fixed_interval;
pub mod trigger;

pub use fixed_interval::{poll_once, FixedIntervalPoller, PollOutcome, PollerStats};
pub use trigger::{MessageTemplate, PollingTrigger};
