//! # Admission managers.
//!
//! Three interchangeable disciplines behind one contract:
//!
//! | Policy          | Concurrency model           | Duplicates               | Snapshot          |
//! |-----------------|-----------------------------|--------------------------|-------------------|
//! | `Deduplicating` | single-owner loop, channels | dropped while in flight  | [`StateSnapshot`] |
//! | `Enqueuing`     | lock + `Notify` monitor     | queued, one per name     | [`QueueSnapshot`] |
//! | `Simple`        | lock + semaphore gate       | dropped while tracked    | [`StateSnapshot`] |
//!
//! [`Manager`] is a closed enum selected by [`Policy`] at construction.
//!
//! ## Invariants (all policies)
//! - At most `N` tasks are running at every observable instant.
//! - Cross-name admission order is unspecified.

mod deduplicating;
mod enqueuing;
mod simple;
mod snapshot;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

pub use deduplicating::DeduplicatingManager;
pub use enqueuing::EnqueuingManager;
pub use simple::SimpleManager;
pub use snapshot::{QueueSnapshot, QueuedTask, Snapshot, StateSnapshot};

use crate::config::Policy;
use crate::error::ManagerError;
use crate::events::Bus;
use crate::work::WorkRef;

/// Submitted tasks: name → requested duration.
pub type Batch = HashMap<String, Duration>;

/// Builds a [`Batch`] from `(name, milliseconds)` pairs.
///
/// ```
/// let b = taskgate::batch_ms([("a", 100), ("b", 250)]);
/// assert_eq!(b["b"], std::time::Duration::from_millis(250));
/// ```
pub fn batch_ms<I, K>(items: I) -> Batch
where
    I: IntoIterator<Item = (K, u64)>,
    K: Into<String>,
{
    items
        .into_iter()
        .map(|(name, ms)| (name.into(), Duration::from_millis(ms)))
        .collect()
}

/// Tracked state of a task (deduplicating / simple).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskState {
    Pending,
    Running,
}

/// One of the three admission managers.
pub enum Manager {
    Deduplicating(DeduplicatingManager),
    Enqueuing(EnqueuingManager),
    Simple(SimpleManager),
}

impl Manager {
    /// Builds the manager for `policy`.
    pub fn new(
        policy: Policy,
        limit: NonZeroUsize,
        queue_capacity: usize,
        work: WorkRef,
        bus: Bus,
    ) -> Self {
        match policy {
            Policy::Deduplicating => Manager::Deduplicating(DeduplicatingManager::new(
                limit,
                queue_capacity,
                work,
                bus,
            )),
            Policy::Enqueuing => Manager::Enqueuing(EnqueuingManager::new(limit, work, bus)),
            Policy::Simple => Manager::Simple(SimpleManager::new(limit, work, bus)),
        }
    }

    pub fn policy(&self) -> Policy {
        match self {
            Manager::Deduplicating(_) => Policy::Deduplicating,
            Manager::Enqueuing(_) => Policy::Enqueuing,
            Manager::Simple(_) => Policy::Simple,
        }
    }

    pub fn limit(&self) -> NonZeroUsize {
        match self {
            Manager::Deduplicating(m) => m.limit(),
            Manager::Enqueuing(m) => m.limit(),
            Manager::Simple(m) => m.limit(),
        }
    }

    /// Accepts a batch; never applies part of it.
    pub async fn submit(&self, batch: Batch) -> Result<(), ManagerError> {
        match self {
            Manager::Deduplicating(m) => m.submit(batch).await,
            Manager::Enqueuing(m) => {
                m.submit(batch).await;
                Ok(())
            }
            Manager::Simple(m) => {
                m.submit(batch).await;
                Ok(())
            }
        }
    }

    /// Runs the scheduling process; must be started exactly once.
    pub async fn run(&self) -> Result<(), ManagerError> {
        match self {
            Manager::Deduplicating(m) => m.run().await,
            Manager::Enqueuing(m) => m.run().await,
            Manager::Simple(m) => m.run().await,
        }
    }

    /// Point-in-time view of the manager's tasks.
    pub async fn snapshot(&self) -> Result<Snapshot, ManagerError> {
        match self {
            Manager::Deduplicating(m) => m.snapshot().await.map(Snapshot::States),
            Manager::Enqueuing(m) => Ok(Snapshot::Queue(m.snapshot().await)),
            Manager::Simple(m) => Ok(Snapshot::States(m.snapshot().await)),
        }
    }
}
