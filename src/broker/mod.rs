//! # Broker contract: the pluggable transport boundary.
//!
//! The engine depends only on the [`Broker`] trait; concrete transports
//! (in-memory, or any external pub/sub / log-structured system) implement it
//! to become pluggable. One canonical contract covers:
//!
//! - **Producer capability**: [`Broker::produce`] publishes a batch of
//!   messages to named destinations, aggregating every failure into a single
//!   observable error.
//! - **Consumer capability**: [`Broker::consume`] performs a bounded pull and
//!   distinguishes "nothing available" (`Ok(None)`) from transport failure;
//!   [`Broker::ack`]/[`Broker::nack`] settle a delivery by its opaque
//!   [`DeliveryTag`].
//! - **Lifecycle**: [`Broker::close`] releases transport resources once the
//!   scheduler has drained.
//!
//! Redelivery policy after a nack (or after a never-acked delivery) belongs
//! to the transport, not to this contract.

mod memory;

pub use memory::MemoryBroker;

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::message::{Message, Outgoing};

/// Opaque identifier for one consumed-but-not-yet-acknowledged message.
///
/// Assigned by the transport at consume time and never interpreted by the
/// engine; it only travels back through [`Broker::ack`] / [`Broker::nack`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeliveryTag(pub u64);

impl std::fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One consumed message together with its settlement tag.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// The consumed message.
    pub message: Message,
    /// Tag for ack/nack of this delivery.
    pub tag: DeliveryTag,
}

/// # Transport boundary for message exchange.
///
/// Implementations are treated as opaque collaborators: their internal
/// concurrency safety is their own responsibility, and all methods take
/// `&self` so a single broker instance can be shared behind an `Arc`.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Publishes one message per named destination.
    ///
    /// Partial success is allowed, but every failed publish must be
    /// reported: implementations aggregate failures into
    /// [`BrokerError::PublishBatch`] rather than silently dropping them.
    async fn produce(&self, outgoing: Vec<Outgoing>) -> Result<(), BrokerError>;

    /// Attempts a non-blocking or bounded pull of the next available message.
    ///
    /// Returns `Ok(None)` when no message is currently available — the
    /// expected "empty" outcome, distinct from a transport failure. Must not
    /// block indefinitely; the scheduler's idle backoff relies on empty pulls
    /// returning promptly.
    async fn consume(&self) -> Result<Option<Delivery>, BrokerError>;

    /// Commits a positive acknowledgment for the given delivery.
    ///
    /// Called at most once per tag in normal operation.
    async fn ack(&self, tag: DeliveryTag) -> Result<(), BrokerError>;

    /// Signals processing failure for the given delivery.
    ///
    /// Optional capability: the exact redelivery policy is a transport
    /// concern. The default surfaces [`BrokerError::Unsupported`] so the
    /// signal is never silently dropped.
    async fn nack(&self, tag: DeliveryTag) -> Result<(), BrokerError> {
        let _ = tag;
        Err(BrokerError::Unsupported { op: "nack" })
    }

    /// Releases all transport resources.
    ///
    /// Safe to call once the scheduler has fully drained.
    async fn close(&self) -> Result<(), BrokerError>;
}
