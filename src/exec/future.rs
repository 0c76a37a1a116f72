//! # TaskFuture: a one-shot, cancellable asynchronous result holder.
//!
//! [`TaskFuture`] exposes the outcome of a background task to any number of
//! callers, each of which may block, poll, time out, or cancel.
//!
//! ## State machine
//! ```text
//! Created ──► Running ──► Succeeded
//!    │           │    └──► Failed
//!    │           └──► Cancelled
//!    └──► Cancelled            (body never starts)
//! ```
//! Transitions are monotonic and happen exactly once into a terminal state;
//! completion is a one-shot gate, so a natural completion racing an external
//! cancel resolves to whichever gets there first and the loser becomes a
//! no-op.
//!
//! ## Cancellation
//! [`TaskFuture::cancel`] is cooperative: with `may_interrupt = true` it also
//! fires the interruption token handed to the body, so a cooperating body can
//! exit early. A body that ignores the token runs to completion, but its
//! result is discarded because the future is already terminal.
//!
//! # Example
//! ```
//! use msgvisor::{FutureState, TaskFuture};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let fut = TaskFuture::spawn(|_interrupt| async { Ok(21 * 2) });
//! assert_eq!(fut.get().await, Ok(42));
//! assert_eq!(fut.state(), FutureState::Succeeded);
//! # }
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::FutureError;

/// Lifecycle state of a [`TaskFuture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureState {
    /// Constructed; the body has not started executing yet.
    Created,
    /// The body is executing.
    Running,
    /// The body returned a value.
    Succeeded,
    /// The body returned an error or panicked.
    Failed,
    /// Cancelled before reaching success or failure.
    Cancelled,
}

impl FutureState {
    /// True for `Succeeded`, `Failed`, and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FutureState::Succeeded | FutureState::Failed | FutureState::Cancelled
        )
    }
}

struct Inner<T> {
    state: FutureState,
    value: Option<T>,
    error: Option<FutureError>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    interrupt: CancellationToken,
}

impl<T: Clone> Shared<T> {
    fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            inner: Mutex::new(Inner {
                state: FutureState::Created,
                value: None,
                error: None,
            }),
            done_tx,
            done_rx,
            interrupt: CancellationToken::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `Created → Running`; false if cancellation won the race.
    fn try_start(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == FutureState::Created {
            inner.state = FutureState::Running;
            true
        } else {
            false
        }
    }

    /// One-shot completion gate; false if already terminal.
    fn complete(&self, outcome: Result<T, FutureError>) -> bool {
        {
            let mut inner = self.lock();
            if inner.state.is_terminal() {
                return false;
            }
            match outcome {
                Ok(value) => {
                    inner.state = FutureState::Succeeded;
                    inner.value = Some(value);
                }
                Err(error) => {
                    inner.state = FutureState::Failed;
                    inner.error = Some(error);
                }
            }
        }
        self.done_tx.send_replace(true);
        true
    }

    fn terminal_outcome(&self) -> Option<Result<T, FutureError>> {
        let inner = self.lock();
        match inner.state {
            FutureState::Succeeded => inner.value.clone().map(Ok),
            FutureState::Failed | FutureState::Cancelled => inner.error.clone().map(Err),
            _ => None,
        }
    }
}

/// Handle to a single asynchronous computation's outcome.
///
/// Cloning yields another handle to the same underlying result; all holders
/// observe the same terminal state and value.
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> TaskFuture<T> {
    /// Spawns `body` on the ambient tokio runtime and returns a future for
    /// its outcome.
    ///
    /// The body receives an interruption token fired by
    /// [`cancel(true)`](TaskFuture::cancel); it should observe the token to
    /// honor early exit. A panic inside the body is recovered and surfaces as
    /// [`FutureError::Failed`].
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FutureError>> + Send + 'static,
    {
        let shared = Arc::new(Shared::new());
        let task_shared = Arc::clone(&shared);

        tokio::spawn(async move {
            // Cancelled before the body ever started: skip Running entirely.
            if !task_shared.try_start() {
                return;
            }
            let interrupt = task_shared.interrupt.clone();
            match AssertUnwindSafe(body(interrupt)).catch_unwind().await {
                Ok(outcome) => {
                    task_shared.complete(outcome);
                }
                Err(payload) => {
                    let error = super::spawn::payload_message(payload.as_ref());
                    task_shared.complete(Err(FutureError::Failed { error }));
                }
            }
        });

        Self { shared }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> FutureState {
        self.shared.lock().state
    }

    /// True once a terminal state has been reached.
    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Blocks until a terminal state is reached and returns the outcome.
    ///
    /// Concurrent callers all observe the same terminal value.
    pub async fn get(&self) -> Result<T, FutureError> {
        let mut rx = self.shared.done_rx.clone();
        loop {
            if let Some(outcome) = self.shared.terminal_outcome() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Sender lives inside Shared, so this is unreachable while a
                // handle exists; resolve defensively anyway.
                return self
                    .shared
                    .terminal_outcome()
                    .unwrap_or(Err(FutureError::Cancelled));
            }
        }
    }

    /// Blocks up to `timeout`; if it elapses first, cancels the underlying
    /// task (with interruption) and returns [`FutureError::Timeout`].
    ///
    /// If the task reached success in the race window before cancellation
    /// took effect, that result is returned instead.
    pub async fn get_timeout(&self, timeout: Duration) -> Result<T, FutureError> {
        match tokio::time::timeout(timeout, self.get()).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => {
                self.cancel(true);
                match self.shared.terminal_outcome() {
                    Some(Ok(value)) => Ok(value),
                    _ => Err(FutureError::Timeout { timeout }),
                }
            }
        }
    }

    /// Same as [`get_timeout`](TaskFuture::get_timeout) but keyed to an
    /// external cancellation token instead of a fixed duration.
    pub async fn get_with_token(&self, token: &CancellationToken) -> Result<T, FutureError> {
        tokio::select! {
            outcome = self.get() => outcome,
            _ = token.cancelled() => {
                self.cancel(true);
                match self.shared.terminal_outcome() {
                    Some(Ok(value)) => Ok(value),
                    _ => Err(FutureError::Cancelled),
                }
            }
        }
    }

    /// Attempts to cancel the future.
    ///
    /// Transitions `Created`/`Running` to `Cancelled`; a no-op on an already
    /// terminal future. With `may_interrupt = true` the body's interruption
    /// token is fired so a cooperating body can exit early. Returns whether
    /// the future is (now or already) cancelled.
    pub fn cancel(&self, may_interrupt: bool) -> bool {
        let cancelled = {
            let mut inner = self.shared.lock();
            match inner.state {
                FutureState::Created | FutureState::Running => {
                    inner.state = FutureState::Cancelled;
                    inner.error = Some(FutureError::Cancelled);
                    true
                }
                FutureState::Cancelled => return true,
                FutureState::Succeeded | FutureState::Failed => return false,
            }
        };
        self.shared.done_tx.send_replace(true);
        if may_interrupt {
            self.shared.interrupt.cancel();
        }
        cancelled
    }

    /// Non-blocking result accessor for callers that already confirmed
    /// completion.
    ///
    /// # Panics
    /// Panics if the future has not succeeded: asking for a result in any
    /// other state is a caller bug and faults loudly rather than returning a
    /// silent default.
    pub fn result_now(&self) -> T {
        let inner = self.shared.lock();
        match inner.state {
            FutureState::Succeeded => inner
                .value
                .clone()
                .expect("succeeded future holds a value"),
            other => panic!("result_now called on {other:?} future"),
        }
    }

    /// Non-blocking error accessor for callers that already confirmed
    /// failure or cancellation.
    ///
    /// # Panics
    /// Panics if the future is not in `Failed` or `Cancelled`.
    pub fn error_now(&self) -> FutureError {
        let inner = self.shared.lock();
        match inner.state {
            FutureState::Failed | FutureState::Cancelled => inner
                .error
                .clone()
                .expect("failed future holds an error"),
            other => panic!("error_now called on {other:?} future"),
        }
    }
}
