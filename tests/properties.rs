mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Probe, advance, config, peak_running, probed, scheduler, snap};
use taskgate::{ConfigError, Policy, Scheduler, Work, batch_ms};
use tokio::sync::{Barrier, mpsc};

const POLICIES: [Policy; 3] = [Policy::Deduplicating, Policy::Enqueuing, Policy::Simple];

#[tokio::test(start_paused = true)]
async fn running_count_never_exceeds_limit() {
    for policy in POLICIES {
        let probe = Probe::arc();
        let sched = probed(policy, 3, &probe);

        sched
            .submit(batch_ms([("a", 15), ("b", 25), ("c", 10), ("d", 30)]))
            .await
            .unwrap();
        sched
            .submit(batch_ms([("a", 5), ("e", 20), ("f", 10), ("g", 15)]))
            .await
            .unwrap();

        let observed = peak_running(&sched, 150).await;
        assert!(observed <= 3, "{policy}: snapshot reported {observed} running");
        assert!(probe.peak() <= 3, "{policy}: work saw {} at once", probe.peak());
        assert!(snap(&sched).await.is_empty(), "{policy}: work left after drain");
    }
}

#[tokio::test(start_paused = true)]
async fn duplicate_of_outstanding_name_is_dropped() {
    for policy in [Policy::Deduplicating, Policy::Simple] {
        let probe = Probe::arc();
        let sched = probed(policy, 2, &probe);

        sched.submit(batch_ms([("A", 50)])).await.unwrap();
        advance(10).await;
        sched.submit(batch_ms([("A", 50)])).await.unwrap();
        advance(100).await;
        assert_eq!(probe.runs_of("A").len(), 1, "{policy}");

        sched.submit(batch_ms([("A", 50)])).await.unwrap();
        advance(100).await;
        assert_eq!(probe.runs_of("A").len(), 2, "{policy}: resubmit after completion");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simple_racing_submits_run_name_once() {
    const RACERS: usize = 16;

    let probe = Probe::arc();
    let sched = probed(Policy::Simple, 4, &probe);
    let start = Arc::new(Barrier::new(RACERS));

    let mut handles = Vec::with_capacity(RACERS);
    for _ in 0..RACERS {
        let sched = Arc::clone(&sched);
        let start = Arc::clone(&start);
        handles.push(tokio::spawn(async move {
            start.wait().await;
            sched.submit(batch_ms([("X", 200)])).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(probe.runs_of("X").len(), 1);
    assert!(snap(&sched).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn duplicate_of_pending_name_is_dropped() {
    let probe = Probe::arc();
    let sched = probed(Policy::Deduplicating, 1, &probe);

    sched.submit(batch_ms([("A", 20), ("B", 20)])).await.unwrap();
    sched.submit(batch_ms([("A", 20), ("B", 20)])).await.unwrap();
    advance(100).await;

    assert_eq!(probe.runs_of("A").len(), 1);
    assert_eq!(probe.runs_of("B").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn enqueued_same_name_runs_in_submission_order() {
    let probe = Probe::arc();
    let sched = probed(Policy::Enqueuing, 4, &probe);

    sched.submit(batch_ms([("A", 30), ("B", 15)])).await.unwrap();
    sched.submit(batch_ms([("A", 10)])).await.unwrap();
    sched.submit(batch_ms([("A", 20)])).await.unwrap();
    advance(100).await;

    let a = probe.runs_of("A");
    let order: Vec<u128> = a.iter().map(|r| r.duration.as_millis()).collect();
    assert_eq!(order, vec![30, 10, 20]);
    for pair in a.windows(2) {
        assert!(pair[0].end <= pair[1].start, "same-name executions overlapped");
    }

    let b = probe.runs_of("B");
    assert_eq!(b.len(), 1);
    assert!(b[0].start < a[0].end, "distinct names should run side by side");
}

#[tokio::test(start_paused = true)]
async fn deferred_backlog_is_fully_drained() {
    let probe = Probe::arc();
    let sched = probed(Policy::Deduplicating, 2, &probe);

    sched
        .submit(batch_ms([
            ("t1", 20),
            ("t2", 20),
            ("t3", 20),
            ("t4", 20),
            ("t5", 20),
            ("t6", 20),
        ]))
        .await
        .unwrap();
    advance(15).await;
    sched
        .submit(batch_ms([
            ("t7", 20),
            ("t8", 20),
            ("t9", 20),
            ("t10", 20),
            ("t5", 20),
            ("t6", 20),
        ]))
        .await
        .unwrap();
    advance(500).await;

    let mut names: Vec<String> = probe.runs().into_iter().map(|r| r.name).collect();
    names.sort();
    let mut expected: Vec<String> = (1..=10).map(|i| format!("t{i}")).collect();
    expected.sort();
    assert_eq!(names, expected);
    assert!(probe.peak() <= 2);
    assert!(snap(&sched).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn completed_task_leaves_snapshot() {
    for policy in POLICIES {
        let sched = scheduler(policy, 1);
        sched.submit(batch_ms([("A", 20)])).await.unwrap();
        advance(1).await;
        assert_eq!(snap(&sched).await.running_count(), 1, "{policy}");

        advance(30).await;
        assert!(snap(&sched).await.is_empty(), "{policy}");
    }
}

/// Reports each finished name as the last step of the work body.
struct Finished(mpsc::UnboundedSender<String>);

#[async_trait]
impl Work for Finished {
    async fn perform(&self, name: &str, duration: Duration) {
        tokio::time::sleep(duration).await;
        let _ = self.0.send(name.to_string());
    }
}

#[tokio::test(start_paused = true)]
async fn snapshot_right_after_completion_drops_task() {
    for policy in POLICIES {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sched = Scheduler::builder(config(policy, 1))
            .with_work(Arc::new(Finished(tx)))
            .build()
            .unwrap();

        sched.submit(batch_ms([("A", 20)])).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("A"), "{policy}");
        tokio::task::yield_now().await;

        let after = snap(&sched).await;
        assert_eq!(after.running_count(), 0, "{policy}: {after:?}");
        assert!(after.is_empty(), "{policy}: {after:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn empty_batch_is_a_no_op() {
    for policy in POLICIES {
        let sched = scheduler(policy, 1);
        sched.submit(batch_ms(Vec::<(&str, u64)>::new())).await.unwrap();
        advance(1).await;
        assert!(snap(&sched).await.is_empty(), "{policy}");
    }
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let cfg = common::config(Policy::Enqueuing, 0);
    let res = Scheduler::builder(cfg).build();
    assert_eq!(res.err(), Some(ConfigError::ZeroConcurrency));
}
