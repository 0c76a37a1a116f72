//! # Message: the immutable unit of transport payload.
//!
//! A [`Message`] carries an opaque byte payload plus optional header metadata.
//! The scheduler never inspects either; headers exist for transports and
//! workers to exchange routing or tracing information.
//!
//! A consumed message travels together with a [`DeliveryTag`](crate::DeliveryTag)
//! inside a [`Delivery`](crate::Delivery); the tag is the only thing the
//! broker needs back for ack/nack.
//!
//! # Example
//! ```
//! use msgvisor::Message;
//!
//! let msg = Message::new(b"hello".to_vec())
//!     .with_header("trace-id", "abc-123")
//!     .with_header("attempt", 1u64);
//!
//! assert_eq!(msg.payload(), b"hello");
//! assert_eq!(msg.header("trace-id").and_then(|v| v.as_str()), Some("abc-123"));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Immutable unit of data exchanged between producer and consumer sides.
///
/// Payload and headers are fixed once constructed; the builder methods
/// consume `self`, so a message cannot be mutated after it has been handed
/// to a broker or worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    payload: Vec<u8>,
    headers: HashMap<String, Value>,
}

impl Message {
    /// Creates a message with the given payload and no headers.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            headers: HashMap::new(),
        }
    }

    /// Attaches a header, returning the updated message.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Returns the raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the message and returns the payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Returns all headers.
    pub fn headers(&self) -> &HashMap<String, Value> {
        &self.headers
    }

    /// Returns a single header value, if present.
    pub fn header(&self, key: &str) -> Option<&Value> {
        self.headers.get(key)
    }
}

/// A message addressed to a named destination, produced by a worker.
///
/// # Example
/// ```
/// use msgvisor::{Message, Outgoing};
///
/// let out = Outgoing::new("billing.events", Message::new(b"charge".to_vec()));
/// assert_eq!(out.destination, "billing.events");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outgoing {
    /// Named channel/topic to publish to.
    pub destination: String,
    /// The message to publish.
    pub message: Message,
}

impl Outgoing {
    /// Creates an outgoing message bound for `destination`.
    pub fn new(destination: impl Into<String>, message: Message) -> Self {
        Self {
            destination: destination.into(),
            message,
        }
    }
}
