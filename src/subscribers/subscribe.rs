//! # Subscribe: reacting to scheduling decisions
//!
//! Every admission decision a manager makes (admit, defer, queue, drop) and every
//! completion is published as an [`Event`]. A `Subscribe` implementation sees those
//! events in publish order, from its own worker with its own bounded queue, so a
//! slow audit sink cannot delay a task slot being released.
//!
//! Events that arrive while the queue is full are dropped for that subscriber only,
//! and the set publishes `SubscriberOverflow` naming it.
//!
//! ## Example: counting dropped duplicates per name
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use async_trait::async_trait;
//! use taskgate::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct Duplicates(Mutex<HashMap<String, u32>>);
//!
//! #[async_trait]
//! impl Subscribe for Duplicates {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind != EventKind::TaskDropped {
//!             return;
//!         }
//!         if let Some(task) = ev.task.as_deref() {
//!             *self.0.lock().unwrap().entry(task.to_string()).or_default() += 1;
//!         }
//!     }
//!     fn name(&self) -> &'static str { "duplicates" }
//!     fn queue_capacity(&self) -> usize { 256 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of scheduling events, installed with
/// [`SchedulerBuilder::with_subscribers`](crate::SchedulerBuilder::with_subscribers).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per event; `TaskDropped` carries the drop cause in `reason`.
    async fn on_event(&self, event: &Event);

    /// Name reported in `SubscriberOverflow` and `SubscriberPanicked` events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
