//! # Scheduler configuration.
//!
//! [`SchedulerConfig`] controls the one knob the engine recognizes — the
//! concurrency cap — plus the capacity of the internal event bus.
//!
//! # Example
//! ```
//! use msgvisor::SchedulerConfig;
//!
//! let mut cfg = SchedulerConfig::default();
//! cfg.max_concurrent_workers = 8;
//!
//! assert_eq!(cfg.max_concurrent_workers, 8);
//! ```

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// `max_concurrent_workers` sizes the [`Limiter`](crate::Limiter) and is the
/// sole backpressure mechanism: it caps how many work cycles may be
/// mid-flight simultaneously. It must be greater than zero;
/// [`Scheduler::start`](crate::Scheduler::start) fails fast otherwise.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently executing work cycles (must be > 0).
    pub max_concurrent_workers: usize,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for SchedulerConfig {
    /// Provides a default configuration:
    /// - `max_concurrent_workers = 4`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent_workers: 4,
            bus_capacity: 1024,
        }
    }
}
