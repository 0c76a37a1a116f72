//! # Runtime events emitted by the scheduler and its work cycles.
//!
//! [`EventKind`] classifies events into three groups:
//! - **Lifecycle**: scheduler start, stop request, drain complete.
//! - **Cycle outcomes**: consume/work/produce/ack results for one message.
//! - **Faults**: recovered worker panics.
//!
//! The [`Event`] struct carries optional metadata (delivery tag, destination
//! count, failure reason) set per kind through builder methods.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore order when events are observed through
//! independent subscriber queues.
//!
//! ## Example
//! ```
//! use msgvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkFailed)
//!     .with_tag(42)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::WorkFailed);
//! assert_eq!(ev.tag, Some(42));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Scheduler lifecycle ===
    /// Dispatch loop has started pulling messages.
    SchedulerStarted,

    /// Stop was requested; no new cycles will be admitted.
    SchedulerStopping,

    /// Drain finished; all in-flight cycles have completed.
    SchedulerStopped,

    // === Cycle outcomes ===
    /// A message was pulled and handed to the worker.
    ///
    /// Sets `tag`.
    WorkReceived,

    /// Transport-level consume failure (distinct from "no message").
    ///
    /// Sets `reason`.
    ConsumeFailed,

    /// The worker returned an error; the message was **not** acknowledged.
    ///
    /// Sets `tag`, `reason`.
    WorkFailed,

    /// Producing the worker's outgoing messages failed; the input was **not**
    /// acknowledged.
    ///
    /// Sets `tag`, `reason`.
    ProduceFailed,

    /// The cycle completed and the input message was acknowledged.
    ///
    /// Sets `tag`, and `outgoing` with the number of produced messages.
    WorkAcked,

    /// The final ack call itself failed.
    ///
    /// Sets `tag`, `reason`.
    AckFailed,

    // === Faults ===
    /// A worker cycle panicked and was recovered by the task runner.
    ///
    /// Sets `reason` with the panic payload.
    WorkerPanicked,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Delivery tag of the message this cycle handled, if any.
    pub tag: Option<u64>,
    /// Number of outgoing messages produced by the cycle.
    pub outgoing: Option<usize>,
    /// Human-readable reason (errors, panic payloads, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            tag: None,
            outgoing: None,
            reason: None,
        }
    }

    /// Attaches the delivery tag of the affected message.
    #[inline]
    pub fn with_tag(mut self, tag: u64) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Attaches the number of outgoing messages produced.
    #[inline]
    pub fn with_outgoing(mut self, n: usize) -> Self {
        self.outgoing = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
