//! # Status snapshots.
//!
//! Read-only, point-in-time views of a manager, serialisable with `serde`:
//!
//! - [`StateSnapshot`] (deduplicating / simple): `{"name": running, ...}`
//! - [`QueueSnapshot`] (enqueuing): `[{"Name": .., "Running": .., "Duration": ms}, ...]`
//!
//! Names absent from a [`StateSnapshot`] are neither pending nor running.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name → "currently running" flag; `false` means pending.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot(pub BTreeMap<String, bool>);

impl StateSnapshot {
    /// Names currently running, in lexical order.
    pub fn running(&self) -> Vec<&str> {
        self.names_where(true)
    }

    /// Names accepted but not yet running, in lexical order.
    pub fn pending(&self) -> Vec<&str> {
        self.names_where(false)
    }

    /// Running flag for `name`, `None` if not tracked.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn names_where(&self, running: bool) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, r)| **r == running)
            .map(|(n, _)| n.as_str())
            .collect()
    }
}

/// One queued occurrence of a task (enqueuing policy).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueuedTask {
    pub name: String,
    /// Only the head occurrence of a name can be running.
    pub running: bool,
    #[serde(with = "millis")]
    pub duration: Duration,
}

/// Every queued occurrence, grouped by name; per-name order is queue order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueSnapshot(pub Vec<QueuedTask>);

impl QueueSnapshot {
    /// Occurrences queued for `name`, head first.
    pub fn for_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a QueuedTask> + 'a {
        self.0.iter().filter(move |t| t.name == name)
    }

    /// Number of occurrences currently running.
    pub fn running_count(&self) -> usize {
        self.0.iter().filter(|t| t.running).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Policy-specific snapshot returned by [`Manager::snapshot`](crate::Manager::snapshot).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Snapshot {
    States(StateSnapshot),
    Queue(QueueSnapshot),
}

impl Snapshot {
    /// Number of tasks reported as running.
    pub fn running_count(&self) -> usize {
        match self {
            Snapshot::States(s) => s.running().len(),
            Snapshot::Queue(q) => q.running_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Snapshot::States(s) => s.is_empty(),
            Snapshot::Queue(q) => q.is_empty(),
        }
    }

    pub fn as_states(&self) -> Option<&StateSnapshot> {
        match self {
            Snapshot::States(s) => Some(s),
            Snapshot::Queue(_) => None,
        }
    }

    pub fn as_queue(&self) -> Option<&QueueSnapshot> {
        match self {
            Snapshot::Queue(q) => Some(q),
            Snapshot::States(_) => None,
        }
    }
}

/// `Duration` as integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
