//! Engine core: the dispatch scheduler, its builder, the concurrency
//! limiter, and OS signal glue.

mod builder;
mod limiter;
mod scheduler;
pub(crate) mod shutdown;

pub use builder::SchedulerBuilder;
pub use limiter::{Limiter, Slot};
pub use scheduler::Scheduler;
