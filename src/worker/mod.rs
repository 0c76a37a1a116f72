//! # Worker abstraction and function-backed worker implementation.
//!
//! This module defines the [`Worker`] trait — the boundary where application
//! logic plugs into the engine — and a convenient function-backed
//! implementation [`WorkerFn`]. The common handle type is [`WorkerRef`], an
//! `Arc<dyn Worker>` suitable for sharing across the engine.
//!
//! A worker receives exactly one [`Message`] per call together with a
//! [`CancellationToken`]; long-running work should periodically check the
//! token to exit promptly during shutdown.

mod worker_fn;

pub use worker_fn::WorkerFn;

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;
use crate::message::{Message, Outgoing};

/// Default idle backoff used by [`Worker::sleep`] when not overridden.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(50);

/// # Shared handle to a worker object.
pub type WorkerRef = std::sync::Arc<dyn Worker>;

/// # Application logic invoked once per consumed message.
///
/// [`Worker::work`] is a pure request/response unit: one message in, zero or
/// more [`Outgoing`] messages out, or an error. An error return means the
/// message must not be positively acknowledged.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use msgvisor::{Message, Outgoing, WorkError, Worker};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Worker for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn work(
///         &self,
///         _ctx: CancellationToken,
///         msg: Message,
///     ) -> Result<Vec<Outgoing>, WorkError> {
///         Ok(vec![Outgoing::new("echo.out", msg)])
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Returns a stable, human-readable worker name.
    fn name(&self) -> &str;

    /// Processes one consumed message.
    ///
    /// May take arbitrarily long but must observe `ctx`: the scheduler
    /// cancels it on shutdown and expects cooperating workers to return
    /// [`WorkError::Canceled`] promptly.
    async fn work(
        &self,
        ctx: CancellationToken,
        message: Message,
    ) -> Result<Vec<Outgoing>, WorkError>;

    /// Idle-backoff hook, invoked when a consume cycle yields no message.
    ///
    /// This is a policy hook, not a blocking contract: the default performs a
    /// bounded delay ([`DEFAULT_IDLE_BACKOFF`]) to avoid a hot-spin poll
    /// loop, and implementations may override it with their own pacing.
    async fn sleep(&self) {
        tokio::time::sleep(DEFAULT_IDLE_BACKOFF).await;
    }
}
