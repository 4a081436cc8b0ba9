#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use taskgate::{Config, Policy, Scheduler, Snapshot, Work};
use tokio::time::Instant;

/// One finished execution observed by [`Probe`].
#[derive(Clone, Debug)]
pub struct Run {
    pub name: String,
    pub duration: Duration,
    pub start: Instant,
    pub end: Instant,
}

/// Work that sleeps like the default, recording concurrency and every run.
#[derive(Default)]
pub struct Probe {
    active: AtomicUsize,
    peak: AtomicUsize,
    runs: Mutex<Vec<Run>>,
}

impl Probe {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> Vec<Run> {
        let mut runs = self.runs.lock().unwrap().clone();
        runs.sort_by_key(|r| r.start);
        runs
    }

    pub fn runs_of(&self, name: &str) -> Vec<Run> {
        self.runs().into_iter().filter(|r| r.name == name).collect()
    }
}

#[async_trait]
impl Work for Probe {
    async fn perform(&self, name: &str, duration: Duration) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let start = Instant::now();

        tokio::time::sleep(duration).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.runs.lock().unwrap().push(Run {
            name: name.to_string(),
            duration,
            start,
            end: Instant::now(),
        });
    }
}

pub fn config(policy: Policy, n: usize) -> Config {
    Config {
        max_concurrent: n,
        policy,
        ..Config::default()
    }
}

pub fn scheduler(policy: Policy, n: usize) -> Arc<Scheduler> {
    Scheduler::builder(config(policy, n)).build().unwrap()
}

pub fn probed(policy: Policy, n: usize, probe: &Arc<Probe>) -> Arc<Scheduler> {
    Scheduler::builder(config(policy, n))
        .with_work(probe.clone())
        .build()
        .unwrap()
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub async fn snap(sched: &Scheduler) -> Snapshot {
    sched.snapshot().await.unwrap()
}

/// Polls the snapshot every millisecond for `ms`, returning the highest running count.
pub async fn peak_running(sched: &Scheduler, ms: u64) -> usize {
    let mut peak = 0;
    for _ in 0..ms {
        peak = peak.max(snap(sched).await.running_count());
        advance(1).await;
    }
    peak
}
