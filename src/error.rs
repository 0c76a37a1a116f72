//! Error types used by the msgvisor engine.
//!
//! This module defines four error enums, one per failure domain:
//!
//! - [`BrokerError`] — transport failures (consume/produce/ack/nack/close).
//! - [`WorkError`] — failures reported by application [`Worker`](crate::Worker)s.
//! - [`SchedulerError`] — misconfiguration caught fast at start.
//! - [`FutureError`] — terminal failure of a [`TaskFuture`](crate::TaskFuture).
//!
//! Transport and work errors are **cycle-scoped**: the scheduler publishes
//! them to the event bus and moves on; they never stop the dispatch loop.
//! Panics are a separate channel entirely — see
//! [`PanicRecord`](crate::PanicRecord).
//!
//! Each type provides an `as_label` helper (short snake_case token for
//! logs/metrics).

use std::time::Duration;

use thiserror::Error;

/// One failed publish inside a batch produce.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    /// Destination whose publish failed.
    pub destination: String,
    /// The underlying transport error message.
    pub error: String,
}

/// # Errors raised by broker transports.
///
/// `Consume` is distinct from "no message available": an empty pull is the
/// `Ok(None)` outcome of [`Broker::consume`](crate::Broker::consume), never
/// an error.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// A single publish failed.
    #[error("publish to '{destination}' failed: {error}")]
    Publish {
        /// Target destination.
        destination: String,
        /// Underlying transport error message.
        error: String,
    },

    /// One or more publishes in a batch failed.
    ///
    /// Partial success is allowed, but every failure must be observable:
    /// the aggregate lists each failed destination.
    #[error("batch publish failed for {} destination(s)", failures.len())]
    PublishBatch {
        /// Every publish that failed, in batch order.
        failures: Vec<PublishFailure>,
    },

    /// Pulling the next message failed at the transport level.
    #[error("consume failed: {error}")]
    Consume {
        /// Underlying transport error message.
        error: String,
    },

    /// Positive acknowledgment failed.
    #[error("ack failed for tag {tag}: {error}")]
    Ack {
        /// Delivery tag being acknowledged.
        tag: u64,
        /// Underlying transport error message.
        error: String,
    },

    /// Negative acknowledgment failed.
    #[error("nack failed for tag {tag}: {error}")]
    Nack {
        /// Delivery tag being declined.
        tag: u64,
        /// Underlying transport error message.
        error: String,
    },

    /// The transport does not implement the requested capability.
    ///
    /// Optional operations (nack) must surface this rather than silently
    /// dropping the signal.
    #[error("operation '{op}' not supported by this transport")]
    Unsupported {
        /// Name of the unsupported operation.
        op: &'static str,
    },

    /// The transport has been closed.
    #[error("broker is closed")]
    Closed,
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::Publish { .. } => "broker_publish",
            BrokerError::PublishBatch { .. } => "broker_publish_batch",
            BrokerError::Consume { .. } => "broker_consume",
            BrokerError::Ack { .. } => "broker_ack",
            BrokerError::Nack { .. } => "broker_nack",
            BrokerError::Unsupported { .. } => "broker_unsupported",
            BrokerError::Closed => "broker_closed",
        }
    }
}

/// # Errors produced by worker execution.
///
/// A `WorkError` means the consumed message must **not** be positively
/// acknowledged; redelivery is then the transport's concern.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkError {
    /// Processing failed but may succeed if the message is redelivered.
    #[error("work failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable failure; redelivering the same message will not help.
    #[error("fatal work error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Work was cancelled by scheduler shutdown.
    #[error("work cancelled")]
    Canceled,
}

impl WorkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Fatal { .. } => "work_fatal",
            WorkError::Canceled => "work_canceled",
        }
    }

    /// Indicates whether redelivering the message is worthwhile.
    ///
    /// # Example
    /// ```
    /// use msgvisor::WorkError;
    ///
    /// assert!(WorkError::Fail { error: "boom".into() }.is_retryable());
    /// assert!(!WorkError::Fatal { error: "nope".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkError::Fail { .. } | WorkError::Canceled)
    }
}

/// # Errors raised by the scheduler itself.
///
/// These are fail-fast misconfigurations surfaced by
/// [`Scheduler::start`](crate::Scheduler::start), never mid-cycle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// `max_concurrent_workers` was zero; the limiter would admit nothing.
    #[error("max_concurrent_workers must be greater than zero")]
    ZeroCapacity,

    /// `start` was called on a scheduler that is already running or stopped.
    #[error("scheduler already started")]
    AlreadyStarted,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::ZeroCapacity => "scheduler_zero_capacity",
            SchedulerError::AlreadyStarted => "scheduler_already_started",
        }
    }
}

/// # Terminal failure of a [`TaskFuture`](crate::TaskFuture).
///
/// Stored inside the future and cloned out to every `get*` caller, so the
/// type is `Clone`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FutureError {
    /// The task body returned an error or panicked.
    #[error("task failed: {error}")]
    Failed {
        /// The underlying error or panic message.
        error: String,
    },

    /// The future was cancelled before reaching success or failure.
    #[error("task cancelled")]
    Cancelled,

    /// A `get_timeout` wait elapsed; the underlying task was cancelled.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The wait duration that elapsed.
        timeout: Duration,
    },
}

impl FutureError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FutureError::Failed { .. } => "future_failed",
            FutureError::Cancelled => "future_cancelled",
            FutureError::Timeout { .. } => "future_timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(
            BrokerError::Consume { error: "x".into() }.as_label(),
            "broker_consume"
        );
        assert_eq!(WorkError::Canceled.as_label(), "work_canceled");
        assert_eq!(
            SchedulerError::ZeroCapacity.as_label(),
            "scheduler_zero_capacity"
        );
        assert_eq!(FutureError::Cancelled.as_label(), "future_cancelled");
    }

    #[test]
    fn test_batch_display_counts_failures() {
        let err = BrokerError::PublishBatch {
            failures: vec![
                PublishFailure {
                    destination: "a".into(),
                    error: "e1".into(),
                },
                PublishFailure {
                    destination: "b".into(),
                    error: "e2".into(),
                },
            ],
        };
        assert_eq!(err.to_string(), "batch publish failed for 2 destination(s)");
    }

    #[test]
    fn test_retryability() {
        assert!(WorkError::Fail { error: "e".into() }.is_retryable());
        assert!(WorkError::Canceled.is_retryable());
        assert!(!WorkError::Fatal { error: "e".into() }.is_retryable());
    }
}
