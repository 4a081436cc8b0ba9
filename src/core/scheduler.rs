//! # Scheduler: wires config, event delivery and the selected manager.
//!
//! The [`Scheduler`] owns the event bus, a [`SubscriberSet`], and one
//! [`Manager`]. It is what the transport layer talks to:
//! [`submit`](Scheduler::submit) a batch, read a [`snapshot`](Scheduler::snapshot).
//!
//! ## High-level architecture
//! ```text
//! SchedulerBuilder::build()
//!   ├─► Bus::new(cfg.bus_capacity)
//!   ├─► SubscriberSet::new(subscribers)        (one worker per subscriber)
//!   ├─► spawn listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   ├─► Manager::new(cfg.policy, N, work)
//!   └─► spawn Manager::run()                   (exactly once)
//!            └─ Err(e) ─► Bus.publish(ManagerFailed { reason: e.as_label() })
//!
//! transport ──► Scheduler::submit(batch) ──► Manager::submit
//!           ──► Scheduler::snapshot()    ──► Manager::snapshot
//! ```
//!
//! - The scheduling loop runs on its own task, independent of any caller.
//! - A failed loop is not restarted; later calls report [`ManagerError::Closed`]
//!   (deduplicating) or keep queueing without progress.
//!
//! ## Example
//! ```rust
//! use taskgate::{Config, Policy, Scheduler, batch_ms};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { max_concurrent: 2, policy: Policy::Enqueuing, ..Config::default() };
//!     let sched = Scheduler::builder(cfg).build()?;
//!
//!     sched.submit(batch_ms([("a", 10), ("b", 10)])).await?;
//!     let snap = sched.snapshot().await?;
//!     println!("{}", serde_json::to_string(&snap)?);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::config::{Config, Policy};
use crate::error::ManagerError;
use crate::events::{Bus, Event, EventKind};
use crate::managers::{Batch, Manager, Snapshot};
use crate::subscribers::SubscriberSet;

use super::builder::SchedulerBuilder;

/// Front door of the crate: one manager plus event fan-out.
pub struct Scheduler {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    manager: Arc<Manager>,
}

impl Scheduler {
    /// Returns a builder for the given configuration.
    pub fn builder(cfg: Config) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    pub(super) fn start(cfg: Config, bus: Bus, subs: Arc<SubscriberSet>, manager: Manager) -> Self {
        let sched = Self {
            cfg,
            bus,
            subs,
            manager: Arc::new(manager),
        };
        sched.subscriber_listener();
        sched.spawn_manager();
        sched
    }

    /// Submits a batch to the active manager.
    pub async fn submit(&self, batch: Batch) -> Result<(), ManagerError> {
        self.manager.submit(batch).await
    }

    /// Reads the active manager's snapshot.
    pub async fn snapshot(&self) -> Result<Snapshot, ManagerError> {
        self.manager.snapshot().await
    }

    pub fn policy(&self) -> Policy {
        self.manager.policy()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus; subscribe here for a raw event stream.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Starts the manager's scheduling process on its own task.
    fn spawn_manager(&self) {
        let manager = Arc::clone(&self.manager);
        let bus = self.bus.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.run().await {
                bus.publish(Event::new(EventKind::ManagerFailed).with_reason(e.as_label()));
            }
        });
    }
}
