//! Execution primitives: panic-isolated spawning and one-shot futures.
//!
//! [`go`]/[`with_recover`] form the single boundary where runtime panics are
//! intercepted and converted into [`PanicRecord`]s; [`TaskFuture`] is the
//! cancellable, awaitable result holder built on top of the same isolation.

mod future;
mod spawn;

pub use future::{FutureState, TaskFuture};
pub use spawn::{go, with_recover, FaultHandler, PanicRecord};
