//! The [`Subscribe`] trait.

use async_trait::async_trait;

use crate::events::Event;

/// # Consumer of engine [`Event`]s.
///
/// Subscribers are isolated from the engine and from each other: each gets
/// its own bounded queue and worker task, a slow subscriber only drops its
/// own events, and a panicking subscriber is caught without disturbing the
/// dispatch loop.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use msgvisor::{Event, Subscribe};
///
/// struct Metrics;
///
/// #[async_trait]
/// impl Subscribe for Metrics {
///     fn name(&self) -> &'static str { "metrics" }
///
///     async fn on_event(&self, ev: &Event) {
///         // record ev.kind ...
///         let _ = ev;
///     }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Stable subscriber name, used in overflow/panic diagnostics.
    fn name(&self) -> &'static str;

    /// Handles one event. Must not assume any global ordering across
    /// subscribers; use [`Event::seq`](crate::Event) to reorder if needed.
    async fn on_event(&self, event: &Event);

    /// Capacity of this subscriber's queue; events beyond it are dropped
    /// for this subscriber only.
    fn queue_capacity(&self) -> usize {
        256
    }
}
