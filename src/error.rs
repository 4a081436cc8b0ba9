//! Error types used by the scheduler and its managers.
//!
//! - [`ManagerError`] errors raised while talking to a running manager.
//! - [`ConfigError`] errors raised while validating a [`Config`](crate::Config).
//!
//! Dropping a duplicate submission is **not** an error: it is an admission
//! decision and is reported as [`EventKind::TaskDropped`](crate::EventKind::TaskDropped).

use thiserror::Error;

/// # Errors produced by a manager.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerError {
    /// `run()` was called on a manager whose scheduling loop already started.
    #[error("manager already running")]
    AlreadyRunning,

    /// Submission queue is full (try again later or use async `submit`).
    #[error("submission queue full")]
    Full,

    /// The scheduling loop is gone; the manager is no longer functional.
    #[error("manager channel closed")]
    Closed,
}

impl ManagerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskgate::ManagerError;
    ///
    /// assert_eq!(ManagerError::Closed.as_label(), "manager_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ManagerError::AlreadyRunning => "manager_already_running",
            ManagerError::Full => "manager_queue_full",
            ManagerError::Closed => "manager_closed",
        }
    }
}

/// # Errors produced by configuration validation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_concurrent` must be a positive integer.
    #[error("max_concurrent must be greater than zero")]
    ZeroConcurrency,

    /// Policy selector did not match any known policy.
    #[error("unknown policy {0:?} (expected deduplicate, enqueue or simple)")]
    UnknownPolicy(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroConcurrency => "config_zero_concurrency",
            ConfigError::UnknownPolicy(_) => "config_unknown_policy",
        }
    }
}
