//! Event bus and runtime event types.
//!
//! Everything the engine wants an operator to see flows through here:
//! scheduler lifecycle, per-cycle transport/work failures, and recovered
//! worker panics. Subscribers consume these events via the
//! [`SubscriberSet`](crate::SubscriberSet) fan-out.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
