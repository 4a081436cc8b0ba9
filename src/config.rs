//! # Scheduler configuration.
//!
//! Provides [`Config`] (centralized settings) and [`Policy`] (which admission
//! discipline the scheduler runs).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → rejected ([`ConfigError::ZeroConcurrency`])
//! - `queue_capacity = 0`, `bus_capacity = 0` → clamped to 1

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::error::ConfigError;

/// Policy controlling how repeated submissions of the same name are handled.
///
/// ## Variants
/// - `Deduplicating`: message-passing loop, duplicates dropped while in flight.
/// - `Enqueuing`: lock + wake monitor, duplicates queued and run one-at-a-time.
/// - `Simple`: semaphore-gated worker per task, duplicates dropped while tracked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Drop a submission if the name is already running (or already pending).
    ///
    /// Use when:
    /// - Redundant work should be avoided
    /// - Example: cache refreshes keyed by resource
    #[default]
    Deduplicating,

    /// Queue every submission (FIFO per name).
    ///
    /// Use when:
    /// - All submissions must execute
    /// - Order matters per name
    Enqueuing,

    /// Drop duplicates; one worker per task gated by a semaphore.
    Simple,
}

impl Policy {
    /// Short stable name (also accepted by [`FromStr`]).
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Deduplicating => "deduplicate",
            Policy::Enqueuing => "enqueue",
            Policy::Simple => "simple",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deduplicate" | "deduplicating" | "dedup" => Ok(Policy::Deduplicating),
            "enqueue" | "enqueuing" | "queue" => Ok(Policy::Enqueuing),
            "simple" => Ok(Policy::Simple),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Global configuration for the scheduler.
///
/// ## Field semantics
/// - `max_concurrent`: concurrency limit `N` (must be `> 0`)
/// - `policy`: admission policy selected at construction
/// - `queue_capacity`: submission channel size of the deduplicating loop (min 1)
/// - `bus_capacity`: event bus ring buffer size (min 1)
///
/// All fields are public; prefer the helper accessors over checking
/// sentinels directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of tasks running at the same time.
    pub max_concurrent: usize,

    /// Which admission discipline to run.
    pub policy: Policy,

    /// Capacity of the submission queue (deduplicating policy only).
    ///
    /// When full, `submit()` waits and `try_submit()` returns `Full`.
    pub queue_capacity: usize,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow listeners lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the concurrency limit, rejecting zero.
    #[inline]
    pub fn concurrency_limit(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.max_concurrent).ok_or(ConfigError::ZeroConcurrency)
    }

    /// Returns a submission queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks that the configuration can build a scheduler.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.concurrency_limit().map(|_| ())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_concurrent = 10`
    /// - `policy = Policy::Deduplicating`
    /// - `queue_capacity = 1024`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            policy: Policy::default(),
            queue_capacity: 1024,
            bus_capacity: 1024,
        }
    }
}
