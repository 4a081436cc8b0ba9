//! # taskgate
//!
//! **taskgate** schedules named units of work under a fixed concurrency cap `N`,
//! with a selectable policy for repeated submissions of the same name.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   transport (HTTP, CLI, ...)                    external collaborators
//!        │ submit(batch)      │ snapshot()
//!        ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - Manager (one of: Deduplicating | Enqueuing | Simple)           │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬─────────────────────────────────────────────────────┬──────┘
//!        ▼                                                     │
//!   Manager admission ──► work.perform(name, duration)         │
//!        │   publishes: TaskAdmitted / TaskDeferred /          │
//!        │              TaskQueued / TaskDropped /             │
//!        │              TaskCompleted / BacklogReplayed        │
//!        ▼                                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          SubscriberSet workers
//!                         (LogWriter → tracing, custom)
//! ```
//!
//! ### Policies
//! | Policy          | Duplicate of an outstanding name | Discipline                      |
//! |-----------------|----------------------------------|---------------------------------|
//! | `Deduplicating` | dropped                          | single-owner loop over channels |
//! | `Enqueuing`     | queued, runs after the previous  | lock + `Notify` monitor         |
//! | `Simple`        | dropped                          | per-task worker + semaphore     |
//!
//! For every policy, at most `N` tasks are running at any observable instant.
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], forwarding events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use taskgate::{Config, Policy, Scheduler, Subscribe, batch_ms};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { max_concurrent: 2, policy: Policy::Deduplicating, ..Config::default() };
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(taskgate::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let sched = Scheduler::builder(cfg).with_subscribers(subs).build()?;
//!
//!     sched.submit(batch_ms([("a", 20), ("b", 20), ("c", 20)])).await?;
//!     let snap = sched.snapshot().await?;
//!     assert_eq!(snap.running_count(), 2);
//!
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     assert!(sched.snapshot().await?.is_empty());
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod managers;
mod subscribers;
mod work;

// ---- Public re-exports ----

pub use config::{Config, Policy};
pub use self::core::{Scheduler, SchedulerBuilder};
pub use error::{ConfigError, ManagerError};
pub use events::{Bus, Event, EventKind};
pub use managers::{
    Batch, DeduplicatingManager, EnqueuingManager, Manager, QueueSnapshot, QueuedTask,
    SimpleManager, Snapshot, StateSnapshot, batch_ms,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use work::{Sleep, Work, WorkFn, WorkRef};

// Optional: built-in subscriber forwarding events to `tracing`.
// Enabled by default; disable with `--no-default-features`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
