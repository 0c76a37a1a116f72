//! # Panic-isolated task launching.
//!
//! [`go`] runs a future on its own tokio task so that a panic inside it can
//! never propagate to (and terminate) the caller's task or the process.
//! [`with_recover`] is the synchronous building block underneath: it wraps a
//! future with recovery without spawning, so callers can get isolation
//! inline or test the wrapping behavior directly.
//!
//! On recovery the runner builds a [`PanicRecord`] (timestamp, panic payload,
//! backtrace captured on the recovery path) and invokes each registered
//! [`FaultHandler`] with it, in registration order. With no handlers the
//! fault is silently contained: containment takes priority over default
//! logging, and callers wanting visibility must register a handler.
//!
//! # Example
//! ```
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use msgvisor::{with_recover, FaultHandler};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let seen = Arc::new(AtomicUsize::new(0));
//! let seen2 = Arc::clone(&seen);
//! let handler: FaultHandler = Arc::new(move |_rec| {
//!     seen2.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! with_recover(async { panic!("boom") }, &[handler]).await;
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! # }
//! ```

use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::SystemTime;

use futures::FutureExt;
use tokio::task::JoinHandle;

/// Callback invoked with a [`PanicRecord`] when a wrapped task faults.
///
/// Handlers run synchronously on the recovery path, in registration order,
/// and should themselves never panic.
pub type FaultHandler = Arc<dyn Fn(&PanicRecord) + Send + Sync>;

/// A recovered runtime fault.
///
/// Immutable after construction; the payload message is formatted eagerly at
/// capture time so `Display` is idempotent and side-effect-free.
#[derive(Debug)]
pub struct PanicRecord {
    /// Wall-clock time at which the fault was recovered.
    pub at: SystemTime,
    /// Stringified panic payload (whatever was passed to `panic!`).
    pub payload: String,
    /// Backtrace captured on the recovery path.
    pub backtrace: Backtrace,
}

impl PanicRecord {
    fn capture(payload: Box<dyn Any + Send>) -> Self {
        Self {
            at: SystemTime::now(),
            payload: payload_message(payload.as_ref()),
            backtrace: Backtrace::capture(),
        }
    }
}

impl std::fmt::Display for PanicRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "panic: {}", self.payload)
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Runs `body` to completion, converting a panic into a [`PanicRecord`]
/// routed to `handlers`.
///
/// This is the only place in the engine where a panic crosses from
/// control-flow back into a value; business logic never catches its own
/// panics.
pub async fn with_recover<F>(body: F, handlers: &[FaultHandler])
where
    F: Future<Output = ()>,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(()) => {}
        Err(payload) => {
            let record = PanicRecord::capture(payload);
            for handler in handlers {
                handler(&record);
            }
        }
    }
}

/// Launches `body` on an independently scheduled tokio task with panic
/// isolation.
///
/// The returned handle joins the *wrapped* task: it completes normally even
/// when the body panicked, since the fault was already recovered and routed
/// to `handlers`.
pub fn go<F>(body: F, handlers: Vec<FaultHandler>) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move { with_recover(body, &handlers).await })
}
