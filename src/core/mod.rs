//! Runtime core: wiring and lifecycle.
//!
//! Internal modules:
//! - [`builder`]: collects config, subscribers and work, then builds the scheduler;
//! - [`scheduler`]: owns the bus, subscriber fan-out and the active manager.

mod builder;
mod scheduler;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
