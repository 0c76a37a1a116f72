//! # msgvisor
//!
//! **msgvisor** is a bounded-concurrency message dispatch engine for Rust.
//!
//! It repeatedly pulls units of work from a pluggable message source,
//! executes application logic against each unit under a concurrency cap,
//! forwards any resulting follow-up messages to one or more destinations,
//! and acknowledges successful processing — all while isolating worker
//! failures from the dispatch loop itself and supporting graceful,
//! drain-based shutdown.
//!
//! ## Architecture
//! ```text
//!            ┌──────────────┐          ┌──────────────┐
//!            │    Broker    │          │    Worker    │
//!            │ (transport)  │          │ (app logic)  │
//!            └──────┬───────┘          └──────┬───────┘
//!                   │ consume/ack             │ work/sleep
//!                   ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Scheduler (dispatch loop)                                    │
//! │  - Limiter (semaphore: caps in-flight cycles)                 │
//! │  - TaskTracker (in-flight counter for drain-on-stop)          │
//! │  - CancellationToken (advisory stop signal to workers)        │
//! │  - panic-isolated cycles (go / with_recover)                  │
//! └──────┬────────────────────────────────────────────────────────┘
//!        │ publishes Events
//!        ▼
//! ┌───────────────────────────────┐
//! │   Bus (broadcast channel)     │
//! └──────────────┬────────────────┘
//!                ▼
//!        ┌───────────────┐     per-subscriber queues
//!        │ SubscriberSet │ ──► worker1 ─► sub1.on_event()
//!        └───────────────┘ ──► workerN ─► subN.on_event()
//! ```
//!
//! ## One cycle
//! ```text
//! acquire slot ─► consume ─► work ─► produce ─► ack
//!                   │          │        │
//!                   │ empty    │ error  │ error
//!                   ▼          ▼        ▼
//!                 sleep     no ack    no ack     (slot released on every path)
//! ```
//!
//! Produce-before-ack is strict within a cycle: an input message is never
//! acknowledged before its derived outputs were handed off. Across cycles no
//! ordering is guaranteed.
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                      |
//! |-----------------|----------------------------------------------------------|-----------------------------------------|
//! | **Transports**  | Pluggable broker boundary plus an in-memory transport.   | [`Broker`], [`MemoryBroker`]            |
//! | **App logic**   | Workers as traits or plain closures.                     | [`Worker`], [`WorkerFn`], [`WorkerRef`] |
//! | **Dispatch**    | Bounded-concurrency loop with graceful drain.            | [`Scheduler`], [`Limiter`]              |
//! | **Isolation**   | Panic-contained task launching with fault records.       | [`go`], [`with_recover`], [`PanicRecord`] |
//! | **Futures**     | One-shot cancellable result holders.                     | [`TaskFuture`], [`FutureState`]         |
//! | **Observability**| Structured events fanned out to subscribers.            | [`Event`], [`Subscribe`], [`SubscriberSet`] |
//! | **Errors**      | Typed errors per failure domain.                         | [`BrokerError`], [`WorkError`], [`SchedulerError`], [`FutureError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use msgvisor::{
//!     MemoryBroker, Message, Outgoing, Scheduler, SchedulerConfig, WorkerFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Arc::new(MemoryBroker::preloaded([
//!         Message::new(b"order-1".to_vec()),
//!         Message::new(b"order-2".to_vec()),
//!     ]));
//!
//!     // Uppercase each payload and forward it.
//!     let worker = WorkerFn::arc("shout", |_ctx: CancellationToken, msg: Message| async move {
//!         let loud = String::from_utf8_lossy(msg.payload()).to_uppercase();
//!         Ok(vec![Outgoing::new("orders.loud", Message::new(loud.into_bytes()))])
//!     });
//!
//!     let mut cfg = SchedulerConfig::default();
//!     cfg.max_concurrent_workers = 2;
//!
//!     let scheduler = Scheduler::builder(cfg, broker.clone(), worker).build();
//!     scheduler.start()?;
//!     tokio::time::sleep(std::time::Duration::from_millis(200)).await;
//!     scheduler.stop().await;
//!
//!     assert_eq!(broker.published("orders.loud").len(), 2);
//!     Ok(())
//! }
//! ```

mod broker;
mod config;
mod core;
mod error;
mod events;
mod exec;
mod message;
mod subscribers;
mod worker;

// ---- Public re-exports ----

pub use broker::{Broker, Delivery, DeliveryTag, MemoryBroker};
pub use config::SchedulerConfig;
pub use core::{Limiter, Scheduler, SchedulerBuilder, Slot};
pub use error::{BrokerError, FutureError, PublishFailure, SchedulerError, WorkError};
pub use events::{Bus, Event, EventKind};
pub use exec::{go, with_recover, FaultHandler, FutureState, PanicRecord, TaskFuture};
pub use message::{Message, Outgoing};
pub use subscribers::{Subscribe, SubscriberSet};
pub use worker::{Worker, WorkerFn, WorkerRef, DEFAULT_IDLE_BACKOFF};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
