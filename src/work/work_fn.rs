//! # Function-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn(String, Duration) -> Fut`, producing a fresh
//! future per admitted task. Shared state, if any, lives in an explicit `Arc`
//! captured by the closure.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgate::{WorkFn, WorkRef};
//!
//! let w: WorkRef = WorkFn::arc(|name: String, d: Duration| async move {
//!     tokio::time::sleep(d).await;
//!     println!("{name} done");
//! });
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::work::Work;

/// Function-backed work implementation.
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates a new function-backed unit of work.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the work and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Work for WorkFn<F>
where
    F: Fn(String, Duration) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn perform(&self, name: &str, duration: Duration) {
        (self.f)(name.to_string(), duration).await
    }
}
