//! # Builder for [`Scheduler`].
//!
//! Wires the broker, worker, subscriber set, and fault handlers together
//! before the dispatch loop starts. Everything the scheduler needs is passed
//! explicitly here — there is no process-wide default pool or implicit
//! global state.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::broker::Broker;
use crate::config::SchedulerConfig;
use crate::core::limiter::Limiter;
use crate::core::scheduler::Scheduler;
use crate::events::{Bus, Event, EventKind};
use crate::exec::{FaultHandler, PanicRecord};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::worker::Worker;

/// Builds a [`Scheduler`], optionally attaching subscribers and fault
/// handlers.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use msgvisor::{MemoryBroker, Message, Scheduler, SchedulerConfig, WorkerFn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let broker = Arc::new(MemoryBroker::new());
/// let worker = WorkerFn::arc("noop", |_ctx: CancellationToken, _m: Message| async {
///     Ok(vec![])
/// });
///
/// let scheduler = Scheduler::builder(SchedulerConfig::default(), broker, worker)
///     .with_fault_handler(Arc::new(|rec| eprintln!("recovered: {rec}")))
///     .build();
/// # let _ = scheduler;
/// # }
/// ```
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    broker: Arc<dyn Broker>,
    worker: Arc<dyn Worker>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    fault_handlers: Vec<FaultHandler>,
}

impl SchedulerBuilder {
    /// Creates a builder with no subscribers and no fault handlers.
    pub fn new(cfg: SchedulerConfig, broker: Arc<dyn Broker>, worker: Arc<dyn Worker>) -> Self {
        Self {
            cfg,
            broker,
            worker,
            subscribers: Vec::new(),
            fault_handlers: Vec::new(),
        }
    }

    /// Replaces the subscriber list.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Registers a fault handler invoked for every recovered worker panic,
    /// in registration order.
    pub fn with_fault_handler(mut self, handler: FaultHandler) -> Self {
        self.fault_handlers.push(handler);
        self
    }

    /// Assembles the scheduler.
    ///
    /// A bus-publishing fault handler is appended after the user-registered
    /// ones so recovered panics always surface as
    /// [`EventKind::WorkerPanicked`] events.
    pub fn build(self) -> Arc<Scheduler> {
        let bus = Bus::new(self.cfg.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(self.subscribers));

        let mut fault_handlers = self.fault_handlers;
        let fault_bus = bus.clone();
        fault_handlers.push(Arc::new(move |rec: &PanicRecord| {
            fault_bus.publish(
                Event::new(EventKind::WorkerPanicked).with_reason(rec.payload.clone()),
            );
        }));

        Arc::new(Scheduler {
            limiter: Arc::new(Limiter::new(self.cfg.max_concurrent_workers)),
            cfg: self.cfg,
            broker: self.broker,
            worker: self.worker,
            bus,
            subs,
            tracker: TaskTracker::new(),
            token: CancellationToken::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            fault_handlers,
        })
    }
}
