//! # Deduplicating manager: single-owner message-passing loop.
//!
//! All scheduling state lives inside the [`run`](DeduplicatingManager::run) future.
//! Everyone else talks to it through channels:
//!
//! ```text
//! submit(batch) ──► [batches]  ──┐
//! snapshot()    ──► [requests] ──┼──► run() ── owns Ledger { states, pending, running }
//! notifiers     ──► [done]     ──┘        │
//!                                         └──► spawn notifier: work.perform() → done.send(name)
//! ```
//!
//! ## Admission (per batch entry)
//! - name already `Running` → drop
//! - `running == N` → defer as `Pending` (first pending submission wins)
//! - otherwise → admit, spawn a completion notifier
//!
//! ## Completion
//! Decrement `running`, forget the name, then **replay the backlog**: the pending
//! set, merged with every batch already waiting in the submission queue
//! (first-seen duration wins), goes back through the same admission routine.
//!
//! ## Rules
//! - The loop polls completions before batches before status requests, so a caller
//!   that submits and then snapshots sees its own batch.
//! - `snapshot()` only answers once `run()` is being driven.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, oneshot};

use super::snapshot::StateSnapshot;
use super::{Batch, TaskState};
use crate::error::ManagerError;
use crate::events::{Bus, Event, EventKind};
use crate::work::{self, WorkRef};

type Reply = oneshot::Sender<StateSnapshot>;

/// Outcome of offering one task to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Admit,
    Defer,
    Drop(&'static str),
}

/// Scheduling state owned by the loop.
struct Ledger {
    limit: usize,
    states: HashMap<String, TaskState>,
    pending: HashMap<String, Duration>,
    running: usize,
}

impl Ledger {
    fn new(limit: NonZeroUsize) -> Self {
        Self {
            limit: limit.get(),
            states: HashMap::new(),
            pending: HashMap::new(),
            running: 0,
        }
    }

    fn offer(&mut self, name: &str, duration: Duration) -> Decision {
        if self.states.get(name) == Some(&TaskState::Running) {
            return Decision::Drop("running");
        }
        if self.running == self.limit {
            if self.pending.contains_key(name) {
                return Decision::Drop("pending");
            }
            self.pending.insert(name.to_string(), duration);
            self.states.insert(name.to_string(), TaskState::Pending);
            return Decision::Defer;
        }
        self.running += 1;
        self.pending.remove(name);
        self.states.insert(name.to_string(), TaskState::Running);
        Decision::Admit
    }

    fn complete(&mut self, name: &str) {
        if self.states.remove(name) == Some(TaskState::Running) {
            self.running -= 1;
        }
        self.pending.remove(name);
    }

    fn take_backlog(&mut self) -> Batch {
        std::mem::take(&mut self.pending)
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot(
            self.states
                .iter()
                .map(|(name, st)| (name.clone(), *st == TaskState::Running))
                .collect(),
        )
    }
}

/// Receivers handed to the loop on first `run()`.
struct Inbox {
    batches: mpsc::Receiver<Batch>,
    requests: mpsc::Receiver<Reply>,
}

/// Drops duplicates of in-flight names; all state owned by one loop.
pub struct DeduplicatingManager {
    limit: NonZeroUsize,
    work: WorkRef,
    bus: Bus,
    batches: mpsc::Sender<Batch>,
    requests: mpsc::Sender<Reply>,
    inbox: Mutex<Option<Inbox>>,
}

impl DeduplicatingManager {
    /// Creates a manager; call [`run`](Self::run) to start its loop.
    ///
    /// `queue_capacity` bounds both the submission and the status queue (min 1).
    pub fn new(limit: NonZeroUsize, queue_capacity: usize, work: WorkRef, bus: Bus) -> Self {
        let cap = queue_capacity.max(1);
        let (batches_tx, batches_rx) = mpsc::channel(cap);
        let (requests_tx, requests_rx) = mpsc::channel(cap);

        Self {
            limit,
            work,
            bus,
            batches: batches_tx,
            requests: requests_tx,
            inbox: Mutex::new(Some(Inbox {
                batches: batches_rx,
                requests: requests_rx,
            })),
        }
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    /// Submit a batch (async, waits if the submission queue is full).
    pub async fn submit(&self, batch: Batch) -> Result<(), ManagerError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.batches
            .send(batch)
            .await
            .map_err(|_| ManagerError::Closed)
    }

    /// Try to submit without waiting (fails if the submission queue is full).
    pub fn try_submit(&self, batch: Batch) -> Result<(), ManagerError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.batches.try_send(batch).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ManagerError::Full,
            mpsc::error::TrySendError::Closed(_) => ManagerError::Closed,
        })
    }

    /// Asks the loop for its current state.
    pub async fn snapshot(&self) -> Result<StateSnapshot, ManagerError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(tx)
            .await
            .map_err(|_| ManagerError::Closed)?;
        rx.await.map_err(|_| ManagerError::Closed)
    }

    /// Runs the scheduling loop. Never returns `Ok`.
    ///
    /// Returns [`ManagerError::AlreadyRunning`] if the loop was started before.
    pub async fn run(&self) -> Result<(), ManagerError> {
        let Inbox {
            mut batches,
            mut requests,
        } = self
            .inbox
            .lock()
            .await
            .take()
            .ok_or(ManagerError::AlreadyRunning)?;

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<String>();
        let mut ledger = Ledger::new(self.limit);

        loop {
            tokio::select! {
                biased;

                Some(name) = done_rx.recv() => {
                    self.complete(&mut ledger, &name);
                    self.replay(&mut ledger, &mut batches, &done_tx);
                }
                batch = batches.recv() => {
                    let Some(batch) = batch else { return Err(ManagerError::Closed) };
                    self.admit(&mut ledger, batch, &done_tx);
                }
                reply = requests.recv() => {
                    let Some(reply) = reply else { return Err(ManagerError::Closed) };
                    let _ = reply.send(ledger.snapshot());
                }
            }
        }
    }

    /// The single admission routine, shared by fresh batches and backlog replay.
    fn admit(&self, ledger: &mut Ledger, batch: Batch, done: &mpsc::UnboundedSender<String>) {
        for (name, duration) in batch {
            match ledger.offer(&name, duration) {
                Decision::Admit => {
                    self.bus.publish(
                        Event::new(EventKind::TaskAdmitted)
                            .with_task(name.as_str())
                            .with_duration(duration)
                            .with_running(ledger.running),
                    );
                    self.spawn_notifier(name, duration, done.clone());
                }
                Decision::Defer => {
                    self.bus.publish(
                        Event::new(EventKind::TaskDeferred)
                            .with_task(name.as_str())
                            .with_duration(duration),
                    );
                }
                Decision::Drop(reason) => self.bus.publish(Event::dropped(&name, reason)),
            }
        }
    }

    fn complete(&self, ledger: &mut Ledger, name: &str) {
        ledger.complete(name);
        self.bus.publish(
            Event::new(EventKind::TaskCompleted)
                .with_task(name)
                .with_running(ledger.running),
        );
    }

    /// Re-offers the backlog, merged with batches already waiting in the queue.
    fn replay(
        &self,
        ledger: &mut Ledger,
        batches: &mut mpsc::Receiver<Batch>,
        done: &mpsc::UnboundedSender<String>,
    ) {
        let mut backlog = ledger.take_backlog();
        let replayed = backlog.len();
        while let Ok(batch) = batches.try_recv() {
            for (name, duration) in batch {
                backlog.entry(name).or_insert(duration);
            }
        }
        if replayed > 0 {
            self.bus
                .publish(Event::new(EventKind::BacklogReplayed).with_depth(replayed));
        }
        self.admit(ledger, backlog, done);
    }

    fn spawn_notifier(
        &self,
        name: String,
        duration: Duration,
        done: mpsc::UnboundedSender<String>,
    ) {
        let w = Arc::clone(&self.work);
        tokio::spawn(async move {
            work::perform(w.as_ref(), &name, duration).await;
            let _ = done.send(name);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex as StdMutex, OnceLock};

    use async_trait::async_trait;

    use super::*;
    use crate::managers::batch_ms;
    use crate::work::{Sleep, Work};

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    const MS: Duration = Duration::from_millis(10);

    #[test]
    fn test_ledger_admits_up_to_limit_then_defers() {
        let mut l = Ledger::new(limit(2));
        assert_eq!(l.offer("a", MS), Decision::Admit);
        assert_eq!(l.offer("b", MS), Decision::Admit);
        assert_eq!(l.offer("c", MS), Decision::Defer);
        assert_eq!(l.running, 2);
        assert_eq!(l.snapshot().pending(), vec!["c"]);
    }

    #[test]
    fn test_ledger_drops_running_and_repeated_pending() {
        let mut l = Ledger::new(limit(1));
        assert_eq!(l.offer("a", MS), Decision::Admit);
        assert_eq!(l.offer("a", MS), Decision::Drop("running"));
        assert_eq!(l.offer("b", MS), Decision::Defer);
        assert_eq!(l.offer("b", Duration::from_secs(1)), Decision::Drop("pending"));
        assert_eq!(l.pending.get("b"), Some(&MS));
    }

    #[test]
    fn test_ledger_complete_frees_slot_and_forgets_name() {
        let mut l = Ledger::new(limit(1));
        l.offer("a", MS);
        l.offer("b", MS);
        l.complete("a");
        assert_eq!(l.running, 0);
        assert_eq!(l.snapshot().get("a"), None);

        let backlog = l.take_backlog();
        assert_eq!(backlog.len(), 1);
        assert!(l.pending.is_empty());
        // "b" is still tracked as pending until it is re-offered.
        assert_eq!(l.snapshot().get("b"), Some(false));
        assert_eq!(l.offer("b", MS), Decision::Admit);
        assert_eq!(l.snapshot().get("b"), Some(true));
    }

    #[test]
    fn test_ledger_complete_unknown_name_is_noop() {
        let mut l = Ledger::new(limit(1));
        l.offer("a", MS);
        l.complete("zzz");
        assert_eq!(l.running, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_twice_is_rejected() {
        let m = Arc::new(DeduplicatingManager::new(limit(1), 4, Sleep::arc(), Bus::new(8)));
        let looped = Arc::clone(&m);
        tokio::spawn(async move { looped.run().await });
        tokio::task::yield_now().await;

        assert_eq!(m.run().await, Err(ManagerError::AlreadyRunning));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_submit_reports_full_queue() {
        let m = DeduplicatingManager::new(limit(1), 1, Sleep::arc(), Bus::new(8));
        m.try_submit(batch_ms([("a", 10)])).unwrap();
        assert_eq!(m.try_submit(batch_ms([("b", 10)])), Err(ManagerError::Full));
        assert_eq!(m.try_submit(Batch::new()), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_promotes_pending_after_completion() {
        let m = Arc::new(DeduplicatingManager::new(limit(1), 4, Sleep::arc(), Bus::new(8)));
        let looped = Arc::clone(&m);
        tokio::spawn(async move { looped.run().await });

        m.submit(batch_ms([("a", 100)])).await.unwrap();
        m.submit(batch_ms([("b", 100)])).await.unwrap();
        let snap = m.snapshot().await.unwrap();
        assert_eq!(snap.running(), vec!["a"]);
        assert_eq!(snap.pending(), vec!["b"]);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let snap = m.snapshot().await.unwrap();
        assert_eq!(snap.running(), vec!["b"]);
        assert!(snap.pending().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(m.snapshot().await.unwrap().is_empty());
    }

    /// Records runs; when "a" finishes it queues a batch without waiting.
    #[derive(Default)]
    struct Resubmit {
        manager: OnceLock<Arc<DeduplicatingManager>>,
        runs: StdMutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl Work for Resubmit {
        async fn perform(&self, name: &str, duration: Duration) {
            tokio::time::sleep(duration).await;
            self.runs
                .lock()
                .unwrap()
                .push((name.to_string(), duration.as_millis() as u64));
            if name == "a" {
                let m = self.manager.get().unwrap();
                m.try_submit(batch_ms([("p", 99), ("b", 10), ("c", 10)]))
                    .unwrap();
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_merges_queued_batch_first_seen_wins() {
        let work = Arc::new(Resubmit::default());
        let m = Arc::new(DeduplicatingManager::new(
            limit(1),
            4,
            work.clone(),
            Bus::new(64),
        ));
        assert!(work.manager.set(Arc::clone(&m)).is_ok());

        let looped = Arc::clone(&m);
        tokio::spawn(async move { looped.run().await });

        m.submit(batch_ms([("a", 10)])).await.unwrap();
        m.submit(batch_ms([("p", 10)])).await.unwrap();
        assert_eq!(m.snapshot().await.unwrap().pending(), vec!["p"]);

        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut runs = work.runs.lock().unwrap().clone();
        runs.sort();
        let expected: Vec<(String, u64)> = [("a", 10), ("b", 10), ("c", 10), ("p", 10)]
            .into_iter()
            .map(|(n, ms)| (n.to_string(), ms))
            .collect();
        assert_eq!(runs, expected);
        assert!(m.snapshot().await.unwrap().is_empty());
    }
}
