//! # In-memory broker transport.
//!
//! [`MemoryBroker`] implements the full [`Broker`](crate::Broker) contract
//! against process-local queues. It is the reference transport for tests and
//! embedded use:
//!
//! - a pending queue that can be pre-loaded before the scheduler starts,
//! - an unacked map keyed by [`DeliveryTag`] — ack removes, nack requeues
//!   (immediate redelivery at the back of the queue),
//! - a per-destination log of produced messages, inspectable after a run,
//! - close semantics: every operation after `close` returns
//!   [`BrokerError::Closed`].
//!
//! # Example
//! ```
//! use msgvisor::{Broker, MemoryBroker, Message};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let broker = MemoryBroker::new();
//! broker.push(Message::new(b"job-1".to_vec()));
//!
//! let delivery = broker.consume().await.unwrap().unwrap();
//! assert_eq!(delivery.message.payload(), b"job-1");
//! broker.ack(delivery.tag).await.unwrap();
//! assert_eq!(broker.unacked_len(), 0);
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::broker::{Broker, Delivery, DeliveryTag};
use crate::error::BrokerError;
use crate::message::{Message, Outgoing};

struct Inner {
    pending: VecDeque<Message>,
    unacked: HashMap<u64, Message>,
    published: HashMap<String, Vec<Message>>,
    closed: bool,
}

/// Process-local broker backed by in-memory queues.
///
/// All methods take `&self`; internal state sits behind a mutex that is never
/// held across an await point.
pub struct MemoryBroker {
    inner: Mutex<Inner>,
    next_tag: AtomicU64,
}

impl MemoryBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                unacked: HashMap::new(),
                published: HashMap::new(),
                closed: false,
            }),
            next_tag: AtomicU64::new(1),
        }
    }

    /// Creates a broker pre-loaded with the given messages, in order.
    pub fn preloaded(messages: impl IntoIterator<Item = Message>) -> Self {
        let broker = Self::new();
        for msg in messages {
            broker.push(msg);
        }
        broker
    }

    /// Enqueues a message for consumption.
    pub fn push(&self, message: Message) {
        self.lock().pending.push_back(message);
    }

    /// Number of messages waiting to be consumed.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of consumed-but-unsettled deliveries.
    pub fn unacked_len(&self) -> usize {
        self.lock().unacked.len()
    }

    /// Messages produced to `destination` so far.
    pub fn published(&self, destination: &str) -> Vec<Message> {
        self.lock()
            .published
            .get(destination)
            .cloned()
            .unwrap_or_default()
    }

    // Poisoning only happens if a holder panicked between plain field edits;
    // the state is still consistent, so recover the guard.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn produce(&self, outgoing: Vec<Outgoing>) -> Result<(), BrokerError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(BrokerError::Closed);
        }
        for out in outgoing {
            inner
                .published
                .entry(out.destination)
                .or_default()
                .push(out.message);
        }
        Ok(())
    }

    async fn consume(&self) -> Result<Option<Delivery>, BrokerError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(BrokerError::Closed);
        }
        match inner.pending.pop_front() {
            None => Ok(None),
            Some(message) => {
                let tag = self.next_tag.fetch_add(1, AtomicOrdering::Relaxed);
                inner.unacked.insert(tag, message.clone());
                Ok(Some(Delivery {
                    message,
                    tag: DeliveryTag(tag),
                }))
            }
        }
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), BrokerError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(BrokerError::Closed);
        }
        match inner.unacked.remove(&tag.0) {
            Some(_) => Ok(()),
            None => Err(BrokerError::Ack {
                tag: tag.0,
                error: "unknown delivery tag".into(),
            }),
        }
    }

    async fn nack(&self, tag: DeliveryTag) -> Result<(), BrokerError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(BrokerError::Closed);
        }
        match inner.unacked.remove(&tag.0) {
            Some(message) => {
                inner.pending.push_back(message);
                Ok(())
            }
            None => Err(BrokerError::Nack {
                tag: tag.0,
                error: "unknown delivery tag".into(),
            }),
        }
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let mut inner = self.lock();
        inner.closed = true;
        inner.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consume_empty_returns_none_not_error() {
        let broker = MemoryBroker::new();
        assert!(broker.consume().await.expect("consume").is_none());
    }

    #[tokio::test]
    async fn test_consume_then_ack_settles_delivery() {
        let broker = MemoryBroker::preloaded([Message::new(b"a".to_vec())]);
        let d = broker.consume().await.expect("consume").expect("delivery");
        assert_eq!(broker.unacked_len(), 1);
        broker.ack(d.tag).await.expect("ack");
        assert_eq!(broker.unacked_len(), 0);
        assert_eq!(broker.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_ack_unknown_tag_is_error() {
        let broker = MemoryBroker::new();
        let err = broker.ack(DeliveryTag(99)).await.expect_err("should fail");
        assert_eq!(err.as_label(), "broker_ack");
    }

    #[tokio::test]
    async fn test_nack_requeues_for_redelivery() {
        let broker = MemoryBroker::preloaded([Message::new(b"a".to_vec())]);
        let d = broker.consume().await.expect("consume").expect("delivery");
        broker.nack(d.tag).await.expect("nack");
        assert_eq!(broker.pending_len(), 1);

        let again = broker.consume().await.expect("consume").expect("redelivery");
        assert_eq!(again.message.payload(), b"a");
        // Redelivery gets a fresh tag.
        assert_ne!(again.tag, d.tag);
    }

    #[tokio::test]
    async fn test_produce_records_per_destination() {
        let broker = MemoryBroker::new();
        broker
            .produce(vec![
                Outgoing::new("out.a", Message::new(b"1".to_vec())),
                Outgoing::new("out.b", Message::new(b"2".to_vec())),
                Outgoing::new("out.a", Message::new(b"3".to_vec())),
            ])
            .await
            .expect("produce");

        assert_eq!(broker.published("out.a").len(), 2);
        assert_eq!(broker.published("out.b").len(), 1);
        assert!(broker.published("out.c").is_empty());
    }

    #[tokio::test]
    async fn test_operations_after_close_fail() {
        let broker = MemoryBroker::preloaded([Message::new(b"a".to_vec())]);
        broker.close().await.expect("close");

        assert!(matches!(
            broker.consume().await,
            Err(BrokerError::Closed)
        ));
        assert!(matches!(
            broker.produce(vec![]).await,
            Err(BrokerError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_tags_are_unique_across_deliveries() {
        let broker = MemoryBroker::preloaded([
            Message::new(b"a".to_vec()),
            Message::new(b"b".to_vec()),
        ]);
        let d1 = broker.consume().await.expect("consume").expect("d1");
        let d2 = broker.consume().await.expect("consume").expect("d2");
        assert_ne!(d1.tag, d2.tag);
    }
}
