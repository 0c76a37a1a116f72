//! Subscriber API: hook into engine events for logging, metrics, or custom
//! processing.
//!
//! Implement [`Subscribe`] and hand the instance to
//! [`SchedulerBuilder::with_subscriber`](crate::SchedulerBuilder::with_subscriber);
//! the scheduler fans events out through a [`SubscriberSet`] without awaiting
//! any subscriber.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
