//! # Scheduling scenarios
//!
//! Runs the same burst of submissions under one policy and prints snapshots
//! as the work drains. Events are logged through [`taskgate::LogWriter`].
//!
//! ## Run
//! ```bash
//! cargo run --example scenarios                # deduplicate
//! cargo run --example scenarios -- enqueue 1
//! RUST_LOG=taskgate=debug cargo run --example scenarios -- simple 3
//! ```

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use taskgate::{Config, LogWriter, Policy, Scheduler, Subscribe, batch_ms};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskgate=info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let policy: Policy = match args.next() {
        Some(raw) => raw.parse()?,
        None => Policy::default(),
    };
    let max_concurrent: usize = match args.next() {
        Some(raw) => raw.parse().context("concurrency must be a number")?,
        None => 2,
    };

    let cfg = Config {
        max_concurrent,
        policy,
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sched = Scheduler::builder(cfg).with_subscribers(subs).build()?;
    println!("policy={} max_concurrent={max_concurrent}", sched.policy());

    sched
        .submit(batch_ms([("build", 300), ("lint", 100), ("test", 200)]))
        .await?;
    sched
        .submit(batch_ms([("lint", 100), ("docs", 150)]))
        .await?;

    for tick in 0..8 {
        let snap = sched.snapshot().await?;
        println!(
            "t={:>4}ms running={} {}",
            tick * 100,
            snap.running_count(),
            serde_json::to_string(&snap)?
        );
        if tick > 0 && snap.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // let the subscriber worker flush the tail of the log
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(())
}
