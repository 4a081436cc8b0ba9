use std::sync::Arc;

use crate::{
    config::Config,
    error::ConfigError,
    events::Bus,
    managers::Manager,
    subscribers::{Subscribe, SubscriberSet},
    work::{Sleep, WorkRef},
};

use super::scheduler::Scheduler;

/// Builder for constructing a [`Scheduler`].
pub struct SchedulerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    work: Option<WorkRef>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            work: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (admissions, drops, completions, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the default [`Sleep`] work with a custom unit of work.
    pub fn with_work(mut self, work: WorkRef) -> Self {
        self.work = Some(work);
        self
    }

    /// Validates the config, builds every component and starts the scheduling loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Arc<Scheduler>, ConfigError> {
        self.cfg.validate()?;
        let limit = self.cfg.concurrency_limit()?;
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let manager = Manager::new(
            self.cfg.policy,
            limit,
            self.cfg.queue_capacity_clamped(),
            self.work.unwrap_or_else(Sleep::arc),
            bus.clone(),
        );

        Ok(Arc::new(Scheduler::start(self.cfg, bus, subs, manager)))
    }
}
