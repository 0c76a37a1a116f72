//! # Limiter: the counting admission gate.
//!
//! [`Limiter`] bounds how many work cycles may be mid-flight simultaneously.
//! It is the engine's **only** backpressure mechanism: when the source
//! produces messages faster than workers drain them, the dispatch loop
//! suspends in [`Limiter::acquire`] instead of growing an unbounded set of
//! tasks.
//!
//! Acquire/release pairing is enforced by RAII: a successful acquire returns
//! a [`Slot`] whose drop releases the permit, so the release happens on every
//! path — normal return, early return, or unwind out of a panicking cycle.
//!
//! # Example
//! ```
//! use msgvisor::Limiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = Limiter::new(2);
//! let a = limiter.acquire().await.unwrap();
//! let b = limiter.acquire().await.unwrap();
//! assert_eq!(limiter.available(), 0);
//!
//! drop(a);
//! assert_eq!(limiter.available(), 1);
//! # drop(b);
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate bounding concurrent admissions to `capacity`.
pub struct Limiter {
    sem: Arc<Semaphore>,
    capacity: usize,
}

/// An admitted slot; dropping it releases the permit back to the limiter.
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl Limiter {
    /// Creates a limiter with the given capacity.
    ///
    /// Capacity is fixed for the limiter's lifetime; it is never resized.
    pub fn new(capacity: usize) -> Self {
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Suspends until a slot is available.
    ///
    /// Returns `None` once the limiter has been closed; pending and future
    /// acquires all observe the close.
    pub async fn acquire(&self) -> Option<Slot> {
        match self.sem.clone().acquire_owned().await {
            Ok(permit) => Some(Slot { _permit: permit }),
            Err(_closed) => None,
        }
    }

    /// Non-suspending acquire; `None` when at capacity or closed.
    pub fn try_acquire(&self) -> Option<Slot> {
        self.sem
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| Slot { _permit: permit })
    }

    /// The fixed capacity this limiter was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently available slots, in `[0, capacity]`.
    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    /// Closes the limiter, waking every pending acquire with `None`.
    pub fn close(&self) {
        self.sem.close();
    }
}
