//! # Enqueuing manager: shared state guarded by a monitor.
//!
//! Duplicate submissions are never dropped. Every occurrence of a name is queued
//! in arrival order and runs strictly after the previous one finished; distinct
//! names run concurrently up to `N`.
//!
//! ```text
//! submit ──► lock ─ push_back(name, d) ─ unlock ─ notify ─┐
//!                                                          ▼
//! run():   loop { lock; while !admissible { unlock; park on Notify; lock }
//!                 mark head executing; running += 1; unlock; spawn execute }
//!                                                          ▲
//! execute: work.perform() ─ lock ─ pop head ─ running -= 1 ─ unlock ─ notify
//! ```
//!
//! ## Admission predicate
//! queues non-empty **and** `running < N` **and** some queued name's head is not executing.
//!
//! ## Rules
//! - The head stays in its queue while running; it is popped on completion,
//!   so snapshots show it with `running = true`.
//! - Which eligible name wins is unspecified.

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, RwLock};

use super::Batch;
use super::snapshot::{QueueSnapshot, QueuedTask};
use crate::error::ManagerError;
use crate::events::{Bus, Event, EventKind};
use crate::work::{self, WorkRef};

/// Guarded state.
#[derive(Default)]
struct Queues {
    tasks: HashMap<String, VecDeque<Duration>>,
    executing: HashSet<String>,
    running: usize,
}

impl Queues {
    /// Appends one occurrence; returns the queue depth for `name`.
    fn push(&mut self, name: String, duration: Duration) -> usize {
        let q = self.tasks.entry(name).or_default();
        q.push_back(duration);
        q.len()
    }

    /// Claims the head of some idle queue if the predicate holds.
    fn admit_next(&mut self, limit: usize) -> Option<(String, Duration)> {
        if self.running >= limit {
            return None;
        }
        let (name, duration) = self
            .tasks
            .iter()
            .filter(|(name, _)| !self.executing.contains(*name))
            .find_map(|(name, q)| q.front().map(|d| (name.clone(), *d)))?;

        self.executing.insert(name.clone());
        self.running += 1;
        Some((name, duration))
    }

    /// Pops the finished head of `name`; the queue is dropped once empty.
    fn finish(&mut self, name: &str) {
        if !self.executing.remove(name) {
            return;
        }
        self.running -= 1;
        if let Some(q) = self.tasks.get_mut(name) {
            q.pop_front();
            if q.is_empty() {
                self.tasks.remove(name);
            }
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        let mut names: Vec<&String> = self.tasks.keys().collect();
        names.sort_unstable();

        let mut out = Vec::new();
        for name in names {
            let executing = self.executing.contains(name);
            for (i, d) in self.tasks[name].iter().enumerate() {
                out.push(QueuedTask {
                    name: name.clone(),
                    running: i == 0 && executing,
                    duration: *d,
                });
            }
        }
        QueueSnapshot(out)
    }
}

/// Lock + wake primitive shared with execution tasks.
struct Monitor {
    limit: NonZeroUsize,
    state: RwLock<Queues>,
    wake: Notify,
    work: WorkRef,
    bus: Bus,
}

impl Monitor {
    /// Parks until the predicate holds, then claims one task.
    async fn wait_admissible(&self) -> (String, Duration) {
        loop {
            {
                let mut q = self.state.write().await;
                if let Some((name, duration)) = q.admit_next(self.limit.get()) {
                    self.bus.publish(
                        Event::new(EventKind::TaskAdmitted)
                            .with_task(name.as_str())
                            .with_duration(duration)
                            .with_running(q.running),
                    );
                    return (name, duration);
                }
            }
            // A notify issued between unlock and here is kept as a permit.
            self.wake.notified().await;
        }
    }

    async fn execute(&self, name: String, duration: Duration) {
        work::perform(self.work.as_ref(), &name, duration).await;

        let mut q = self.state.write().await;
        q.finish(&name);
        self.bus.publish(
            Event::new(EventKind::TaskCompleted)
                .with_task(name.as_str())
                .with_running(q.running),
        );
        drop(q);
        self.wake.notify_one();
    }
}

/// Queues duplicates and runs them one-at-a-time per name.
pub struct EnqueuingManager {
    inner: Arc<Monitor>,
    started: AtomicBool,
}

impl EnqueuingManager {
    /// Creates a manager; call [`run`](Self::run) to start admitting.
    pub fn new(limit: NonZeroUsize, work: WorkRef, bus: Bus) -> Self {
        Self {
            inner: Arc::new(Monitor {
                limit,
                state: RwLock::new(Queues::default()),
                wake: Notify::new(),
                work,
                bus,
            }),
            started: AtomicBool::new(false),
        }
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.inner.limit
    }

    /// Appends every entry of `batch` to its name's queue and wakes the scheduler.
    pub async fn submit(&self, batch: Batch) {
        if batch.is_empty() {
            return;
        }
        let mut q = self.inner.state.write().await;
        for (name, duration) in batch {
            let depth = q.push(name.clone(), duration);
            self.inner.bus.publish(
                Event::new(EventKind::TaskQueued)
                    .with_task(name)
                    .with_duration(duration)
                    .with_depth(depth),
            );
        }
        drop(q);
        self.inner.wake.notify_one();
    }

    /// Every queued occurrence, grouped by name.
    pub async fn snapshot(&self) -> QueueSnapshot {
        self.inner.state.read().await.snapshot()
    }

    /// Runs the scheduling loop. Never returns `Ok`.
    pub async fn run(&self) -> Result<(), ManagerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ManagerError::AlreadyRunning);
        }
        loop {
            let (name, duration) = self.inner.wait_admissible().await;
            let monitor = Arc::clone(&self.inner);
            tokio::spawn(async move { monitor.execute(name, duration).await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch_ms;
    use crate::work::Sleep;

    const MS: Duration = Duration::from_millis(10);

    #[test]
    fn test_admit_next_respects_limit() {
        let mut q = Queues::default();
        q.push("a".into(), MS);
        q.push("b".into(), MS);
        q.push("c".into(), MS);

        assert!(q.admit_next(2).is_some());
        assert!(q.admit_next(2).is_some());
        assert!(q.admit_next(2).is_none());
        assert_eq!(q.running, 2);
    }

    #[test]
    fn test_same_name_never_admitted_twice() {
        let mut q = Queues::default();
        q.push("a".into(), MS);
        q.push("a".into(), Duration::from_millis(20));

        assert_eq!(q.admit_next(5), Some(("a".to_string(), MS)));
        assert_eq!(q.admit_next(5), None);

        q.finish("a");
        assert_eq!(
            q.admit_next(5),
            Some(("a".to_string(), Duration::from_millis(20)))
        );
        q.finish("a");
        assert!(q.tasks.is_empty());
        assert_eq!(q.running, 0);
    }

    #[test]
    fn test_finish_without_execution_is_noop() {
        let mut q = Queues::default();
        q.push("a".into(), MS);
        q.finish("a");
        assert_eq!(q.tasks["a"].len(), 1);
    }

    #[test]
    fn test_snapshot_flags_only_running_head() {
        let mut q = Queues::default();
        q.push("b".into(), MS);
        q.push("a".into(), Duration::from_millis(1));
        q.push("a".into(), Duration::from_millis(2));
        q.executing.insert("a".into());
        q.running = 1;

        let snap = q.snapshot();
        let flags: Vec<(&str, bool, u128)> = snap
            .0
            .iter()
            .map(|t| (t.name.as_str(), t.running, t.duration.as_millis()))
            .collect();
        assert_eq!(
            flags,
            vec![("a", true, 1), ("a", false, 2), ("b", false, 10)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_twice_is_rejected() {
        let m = Arc::new(EnqueuingManager::new(
            NonZeroUsize::MIN,
            Sleep::arc(),
            Bus::new(8),
        ));
        let looped = Arc::clone(&m);
        tokio::spawn(async move { looped.run().await });
        tokio::task::yield_now().await;

        assert_eq!(m.run().await, Err(ManagerError::AlreadyRunning));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_before_run_is_kept() {
        let m = Arc::new(EnqueuingManager::new(
            NonZeroUsize::MIN,
            Sleep::arc(),
            Bus::new(8),
        ));
        m.submit(batch_ms([("a", 30)])).await;
        assert_eq!(m.snapshot().await.running_count(), 0);

        let looped = Arc::clone(&m);
        tokio::spawn(async move { looped.run().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(m.snapshot().await.running_count(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(m.snapshot().await.is_empty());
    }
}
