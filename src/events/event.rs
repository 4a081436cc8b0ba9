//! # Runtime events emitted by the managers and the scheduler.
//!
//! The [`EventKind`] enum classifies events into:
//! - **Admission events**: what a manager decided for one submitted task
//! - **Completion events**: a task left its concurrency slot
//! - **Runtime events**: backlog replay, manager failure, subscriber health
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskAdmitted)
//!     .with_task("build")
//!     .with_duration(Duration::from_millis(250))
//!     .with_running(3);
//!
//! assert_eq!(ev.kind, EventKind::TaskAdmitted);
//! assert_eq!(ev.task.as_deref(), Some("build"));
//! assert_eq!(ev.duration_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Admission events ===
    /// Task took a concurrency slot and started executing.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `duration_ms`: simulated work length
    /// - `running`: running count after admission
    TaskAdmitted,

    /// Task was accepted but has to wait for capacity.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `duration_ms`: simulated work length
    TaskDeferred,

    /// Task was appended to its per-name queue (enqueuing policy).
    ///
    /// Sets:
    /// - `task`: task name
    /// - `duration_ms`: simulated work length
    /// - `depth`: queue length for this name after the append
    TaskQueued,

    /// Duplicate submission ignored.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: `"running"`, `"pending"` or `"tracked"`
    TaskDropped,

    // === Completion events ===
    /// Task finished its work and released its slot.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `running`: running count after release
    TaskCompleted,

    // === Runtime events ===
    /// Deduplicating loop re-offered its pending backlog after a completion.
    ///
    /// Sets:
    /// - `depth`: number of backlogged names re-offered
    BacklogReplayed,

    /// Scheduling loop exited with an error; the scheduler is no longer functional.
    ///
    /// Sets:
    /// - `reason`: error label
    ManagerFailed,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: `"full"` or `"closed"`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Simulated work length in milliseconds.
    pub duration_ms: Option<u64>,
    /// Running count observed by the manager when publishing.
    pub running: Option<usize>,
    /// Queue depth or backlog size.
    pub depth: Option<usize>,
    /// Human-readable reason (drop cause, error label, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            duration_ms: None,
            running: None,
            depth: None,
            reason: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a work duration (stored as milliseconds, saturating).
    #[inline]
    pub fn with_duration(mut self, d: Duration) -> Self {
        self.duration_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches the running count.
    #[inline]
    pub fn with_running(mut self, n: usize) -> Self {
        self.running = Some(n);
        self
    }

    /// Attaches a queue depth / backlog size.
    #[inline]
    pub fn with_depth(mut self, n: usize) -> Self {
        self.depth = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a duplicate-dropped event.
    #[inline]
    pub fn dropped(task: &str, reason: &'static str) -> Self {
        Event::new(EventKind::TaskDropped)
            .with_task(task)
            .with_reason(reason)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
