//! # Simple manager: one worker per task, gated by a semaphore.
//!
//! ```text
//! submit(batch) ─ for each name:
//!     lock ─ tracked? ── yes ─► drop
//!              └─ no ─► mark Pending ─ unlock ─ spawn worker
//!
//! worker: acquire permit (waits while N tasks hold one)
//!         lock ─ mark Running ─ unlock
//!         work.perform()
//!         lock ─ remove ─ unlock
//!         release permit
//! ```
//!
//! The tracked-check and the Pending insert happen in one critical section, so
//! two racing submissions of an unseen name spawn exactly one worker. A name
//! is marked Running only while its worker holds a permit, which bounds the
//! running count by `N`. There is no central loop: [`run`](SimpleManager::run)
//! only guards against a second start.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, Semaphore};

use super::snapshot::StateSnapshot;
use super::{Batch, TaskState};
use crate::error::ManagerError;
use crate::events::{Bus, Event, EventKind};
use crate::work::{self, WorkRef};

struct Shared {
    states: RwLock<HashMap<String, TaskState>>,
    gate: Arc<Semaphore>,
    work: WorkRef,
    bus: Bus,
}

impl Shared {
    async fn worker(self: Arc<Self>, name: String, duration: Duration) {
        // The gate is never closed, so acquire only fails if that changes.
        let Ok(permit) = Arc::clone(&self.gate).acquire_owned().await else {
            self.states.write().await.remove(&name);
            return;
        };

        let running = {
            let mut states = self.states.write().await;
            states.insert(name.clone(), TaskState::Running);
            count_running(&states)
        };
        self.bus.publish(
            Event::new(EventKind::TaskAdmitted)
                .with_task(name.as_str())
                .with_duration(duration)
                .with_running(running),
        );

        work::perform(self.work.as_ref(), &name, duration).await;

        let running = {
            let mut states = self.states.write().await;
            states.remove(&name);
            count_running(&states)
        };
        self.bus.publish(
            Event::new(EventKind::TaskCompleted)
                .with_task(name.as_str())
                .with_running(running),
        );
        drop(permit);
    }
}

fn count_running(states: &HashMap<String, TaskState>) -> usize {
    states.values().filter(|s| **s == TaskState::Running).count()
}

/// Drops duplicates of tracked names; concurrency bounded by a semaphore.
pub struct SimpleManager {
    limit: NonZeroUsize,
    shared: Arc<Shared>,
    started: AtomicBool,
}

impl SimpleManager {
    /// Creates a manager. Submissions are admitted without calling `run`.
    pub fn new(limit: NonZeroUsize, work: WorkRef, bus: Bus) -> Self {
        Self {
            limit,
            shared: Arc::new(Shared {
                states: RwLock::new(HashMap::new()),
                gate: Arc::new(Semaphore::new(limit.get())),
                work,
                bus,
            }),
            started: AtomicBool::new(false),
        }
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    /// Tracks every unseen name as Pending and spawns its worker.
    pub async fn submit(&self, batch: Batch) {
        for (name, duration) in batch {
            {
                let mut states = self.shared.states.write().await;
                if states.contains_key(&name) {
                    drop(states);
                    self.shared.bus.publish(Event::dropped(&name, "tracked"));
                    continue;
                }
                states.insert(name.clone(), TaskState::Pending);
            }
            self.shared.bus.publish(
                Event::new(EventKind::TaskDeferred)
                    .with_task(name.as_str())
                    .with_duration(duration),
            );
            tokio::spawn(Arc::clone(&self.shared).worker(name, duration));
        }
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        let states = self.shared.states.read().await;
        StateSnapshot(
            states
                .iter()
                .map(|(name, st)| (name.clone(), *st == TaskState::Running))
                .collect(),
        )
    }

    /// Nothing to drive; parks forever after the first call.
    pub async fn run(&self) -> Result<(), ManagerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ManagerError::AlreadyRunning);
        }
        std::future::pending::<()>().await;
        Ok(())
    }
}
