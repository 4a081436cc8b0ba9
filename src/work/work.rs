//! # Unit of work performed by an admitted task.
//!
//! Managers only decide **when** a task may occupy a concurrency slot; what the
//! task actually does is delegated to a [`Work`] implementation injected at
//! construction. The default [`Sleep`] treats the duration as simulated work.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;

/// # Asynchronous, opaque unit of work.
///
/// `perform` is called once per admitted task and holds the task's slot until
/// it returns. It cannot fail: there is no retry or error path in the scheduler.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use taskgate::Work;
///
/// struct Print;
///
/// #[async_trait]
/// impl Work for Print {
///     async fn perform(&self, name: &str, duration: Duration) {
///         println!("{name} for {duration:?}");
///         tokio::time::sleep(duration).await;
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Executes the work for task `name`; `duration` is its requested length.
    async fn perform(&self, name: &str, duration: Duration);
}

/// Shared handle to a unit of work.
pub type WorkRef = Arc<dyn Work>;

/// Simulated work: sleeps for the task's duration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sleep;

impl Sleep {
    /// Returns the sleeper as a shared [`WorkRef`].
    pub fn arc() -> WorkRef {
        Arc::new(Sleep)
    }
}

#[async_trait]
impl Work for Sleep {
    async fn perform(&self, _name: &str, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `work` for one admitted task, swallowing a panic.
///
/// The caller releases the task's slot once this returns, panic or not.
pub(crate) async fn perform(work: &dyn Work, name: &str, duration: Duration) {
    let _ = AssertUnwindSafe(work.perform(name, duration))
        .catch_unwind()
        .await;
}
