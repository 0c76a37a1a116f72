//! Closure-backed [`Worker`] implementation.

use std::{borrow::Cow, future::Future, sync::Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;
use crate::message::{Message, Outgoing};
use crate::worker::{Worker, WorkerRef};

/// # Function-backed worker implementation.
///
/// [`WorkerFn`] wraps a closure `Fnc: FnMut(CancellationToken, Message) -> Fut`.
/// The closure is protected by a [`Mutex`] to allow calling `work(&self, ...)`
/// concurrently even though the closure is `FnMut`. Use [`WorkerFn::arc`] for
/// a one-liner that returns a [`WorkerRef`].
///
/// ### Concurrency semantics
/// The mutex is held only while the closure *creates* the future, not during
/// its execution, so concurrent cycles do not serialize on each other. State
/// captured by the closure and touched inside the returned future needs its
/// own synchronization.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use msgvisor::{Message, WorkError, WorkerFn, WorkerRef};
///
/// let w: WorkerRef = WorkerFn::arc("uppercase", |_ctx: CancellationToken, msg: Message| async move {
///     let _text = String::from_utf8_lossy(msg.payload()).to_uppercase();
///     Ok(vec![])
/// });
///
/// assert_eq!(w.name(), "uppercase");
/// ```
#[derive(Debug)]
pub struct WorkerFn<Fnc, Fut>
where
    Fnc: FnMut(CancellationToken, Message) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<Outgoing>, WorkError>> + Send + 'static,
{
    /// Stable worker name.
    name: Cow<'static, str>,
    /// Underlying function (guarded by a mutex to allow `FnMut` with `&self`).
    func: Mutex<Fnc>,
}

impl<Fnc, Fut> WorkerFn<Fnc, Fut>
where
    Fnc: FnMut(CancellationToken, Message) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<Outgoing>, WorkError>> + Send + 'static,
{
    /// Creates a new function-backed worker.
    ///
    /// Prefer [`WorkerFn::arc`] when you immediately need a [`WorkerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, func: Fnc) -> Self {
        Self {
            name: name.into(),
            func: Mutex::new(func),
        }
    }

    /// Creates the worker and returns it as a shared handle (`Arc<dyn Worker>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, func: Fnc) -> WorkerRef {
        std::sync::Arc::new(Self::new(name, func))
    }
}

#[async_trait]
impl<Fnc, Fut> Worker for WorkerFn<Fnc, Fut>
where
    Fnc: FnMut(CancellationToken, Message) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<Outgoing>, WorkError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn work(
        &self,
        ctx: CancellationToken,
        message: Message,
    ) -> Result<Vec<Outgoing>, WorkError> {
        let fut = {
            let mut f = self.func.lock().map_err(|_| WorkError::Fatal {
                error: "mutex poisoned".into(),
            })?;
            (f)(ctx, message)
        };
        fut.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_worker_fn_passes_message_through() {
        let w = WorkerFn::arc("double", |_ctx: CancellationToken, msg: Message| async move {
            let doubled: Vec<u8> = msg.payload().iter().flat_map(|b| [*b, *b]).collect();
            Ok(vec![Outgoing::new("out", Message::new(doubled))])
        });

        let out = w
            .work(CancellationToken::new(), Message::new(b"ab".to_vec()))
            .await
            .expect("work");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message.payload(), b"aabb");
    }

    #[tokio::test]
    async fn test_worker_fn_mutable_capture() {
        let mut seen = 0u32;
        let w = WorkerFn::new("counter", move |_ctx: CancellationToken, _msg: Message| {
            seen += 1;
            let n = seen;
            async move {
                if n >= 2 {
                    Err(WorkError::Fail {
                        error: format!("call {n}"),
                    })
                } else {
                    Ok(vec![])
                }
            }
        });

        assert!(w
            .work(CancellationToken::new(), Message::default())
            .await
            .is_ok());
        assert!(w
            .work(CancellationToken::new(), Message::default())
            .await
            .is_err());
    }
}
