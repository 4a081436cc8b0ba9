//! # LogWriter: `tracing` event forwarder
//!
//! Forwards every [`Event`] to the `tracing` crate under the
//! [`LogWriter::TARGET`] target, with the event metadata as structured fields.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO taskgate::events: admitted task="a" duration_ms=100 running=1 seq=0
//! INFO taskgate::events: deferred task="c" duration_ms=100 seq=2
//! DEBUG taskgate::events: dropped task="a" reason="running" seq=3
//! INFO taskgate::events: completed task="a" running=1 seq=4
//! ERROR taskgate::events: manager failed reason="manager_already_running" seq=9
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Target name used in emitted `tracing` events.
    pub const TARGET: &'static str = "taskgate::events";

    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::TaskAdmitted => info!(
                target: LogWriter::TARGET,
                task, duration_ms = e.duration_ms, running = e.running, seq = e.seq,
                "admitted"
            ),
            EventKind::TaskDeferred => info!(
                target: LogWriter::TARGET,
                task, duration_ms = e.duration_ms, seq = e.seq,
                "deferred"
            ),
            EventKind::TaskQueued => info!(
                target: LogWriter::TARGET,
                task, duration_ms = e.duration_ms, depth = e.depth, seq = e.seq,
                "queued"
            ),
            EventKind::TaskDropped => debug!(
                target: LogWriter::TARGET,
                task, reason, seq = e.seq,
                "dropped"
            ),
            EventKind::TaskCompleted => info!(
                target: LogWriter::TARGET,
                task, running = e.running, seq = e.seq,
                "completed"
            ),
            EventKind::BacklogReplayed => debug!(
                target: LogWriter::TARGET,
                depth = e.depth, seq = e.seq,
                "backlog replayed"
            ),
            EventKind::ManagerFailed => error!(
                target: LogWriter::TARGET,
                reason, seq = e.seq,
                "manager failed"
            ),
            EventKind::SubscriberOverflow => warn!(
                target: LogWriter::TARGET,
                subscriber = task, reason, seq = e.seq,
                "subscriber overflow"
            ),
            EventKind::SubscriberPanicked => error!(
                target: LogWriter::TARGET,
                subscriber = task, info = reason, seq = e.seq,
                "subscriber panicked"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
