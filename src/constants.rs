//! # System Constants
//!
//! Reserved metadata keys, lifecycle marker names and the operational defaults
//! that govern pollers, retry strategies, pooled splitters and the management
//! bridge.

use std::time::Duration;

/// Metadata keys the runtime itself reads or writes on a message
pub mod metadata {
    /// Set to `"true"` to stop further processing of a message
    pub const STOP_PROCESSING_KEY: &str = "stop_processing";
    /// Set to `"true"` to make the workflow skip its producer
    pub const WORKFLOW_SKIP_PRODUCER: &str = "workflow_skip_producer";
    /// Value used for the boolean flags above
    pub const FLAG_TRUE: &str = "true";
    /// Sequence number stamped on each split message
    pub const SPLIT_SEQUENCE: &str = "split_sequence";
    /// Unique id of the message a split message was cut from
    pub const SPLIT_PARENT_ID: &str = "split_parent_id";
    /// Records which workflow last processed the message
    pub const WORKFLOW_ID: &str = "workflow_id";
    /// Failure reason recorded when a workflow routes a message to its error handler
    pub const FAILURE_REASON: &str = "failure_reason";
}

/// Names of the trace markers appended to a message's lifecycle trace
pub mod markers {
    pub const WORKFLOW_RECEIVED: &str = "workflow.received";
    pub const WORKFLOW_PRODUCED: &str = "workflow.produced";
    pub const WORKFLOW_SKIPPED_PRODUCER: &str = "workflow.skipped_producer";
    pub const WORKFLOW_FAILED: &str = "workflow.failed";
    pub const SERVICE_APPLIED: &str = "service.applied";
    pub const MESSAGE_SPLIT: &str = "message.split";
}

/// Object attachment keys reserved by the runtime
pub mod objects {
    /// Completion monitor attached by `CompletionMonitorInterceptor`
    pub const COMPLETION_MONITOR: &str = "integration_runtime.completion_monitor";
}

/// Default timings and limits
pub mod defaults {
    use super::Duration;

    /// Delay between the end of one poll and the start of the next
    pub const POLL_INTERVAL: Duration = Duration::from_secs(20);
    /// Delay before the first poll after a poller starts
    pub const POLL_INITIAL_DELAY: Duration = Duration::from_millis(100);
    /// Bounded wait for a scheduler or pool to terminate before it is forced
    pub const SHUTDOWN_WAIT: Duration = Duration::from_secs(60);

    /// Attempts after the first one made by `WorkflowRetryAndContinue`
    pub const MAX_RETRIES: i32 = 5;
    /// Sentinel meaning retry without limit
    pub const INFINITE_RETRIES: i32 = -1;
    /// Pause between lifecycle retry attempts
    pub const WAIT_BETWEEN_RETRIES: Duration = Duration::from_secs(10);

    /// Worker tasks used by a pooled splitter
    pub const SPLITTER_MAX_THREADS: usize = 10;
    /// Bounded wait to borrow a pooled worker
    pub const POOL_BORROW_TIMEOUT: Duration = Duration::from_secs(60);

    /// Bounded wait for an injected message's reply
    pub const MAX_REPLY_WAIT: Duration = Duration::from_secs(60);
    /// Interval at which the reply cache is checked
    pub const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Width of one message metrics time slice
    pub const METRICS_SLICE_DURATION: Duration = Duration::from_secs(300);
    /// Number of metrics time slices retained (about an hour)
    pub const METRICS_MAX_SLICES: usize = 12;
}
