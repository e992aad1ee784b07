//! Dispatch and aggregation properties of the worker pool core.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::time::Duration;
use taskmill::{
    aggregate, check_all, run_pool, split_halves, PoolConfig, Task, TaskFailure, WorkerPool,
};

/// Task that sleeps a random handful of milliseconds before echoing its
/// payload, so completion order genuinely diverges from submission order.
struct Jittered {
    payload: u64,
}

#[async_trait]
impl Task for Jittered {
    type Output = u64;

    async fn run(&self) -> Result<u64, TaskFailure> {
        let jitter = Duration::from_millis(fastrand::u64(0..5));
        tokio::time::sleep(jitter).await;
        Ok(self.payload)
    }
}

/// Fails on odd payloads.
struct OddRejecter {
    payload: u64,
}

#[async_trait]
impl Task for OddRejecter {
    type Output = u64;

    async fn run(&self) -> Result<u64, TaskFailure> {
        if self.payload % 2 == 1 {
            Err(TaskFailure::failed(format!("odd payload {}", self.payload)))
        } else {
            Ok(self.payload)
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_every_task_reported_exactly_once() {
    for workers in [1usize, 2, 4, 8] {
        for batch in [0usize, 1, 13, 100] {
            let tasks = (0..batch as u64).map(|n| Jittered { payload: n }).collect();
            let reports = run_pool(workers, tasks).await.unwrap();

            assert_eq!(reports.len(), batch, "workers={workers} batch={batch}");
            let indices: HashSet<usize> = reports.iter().map(|report| report.index).collect();
            assert_eq!(indices.len(), batch, "duplicate or lost report");
            for report in reports {
                assert_eq!(report.outcome.unwrap(), report.index as u64);
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failures_are_delivered_not_fatal() {
    let tasks = (0..20).map(|n| OddRejecter { payload: n }).collect();
    let pool = WorkerPool::new(PoolConfig::with_workers(4)).unwrap();
    let reports = pool.run(tasks).await.unwrap();

    assert_eq!(reports.len(), 20);
    let failed = reports.iter().filter(|report| !report.is_success()).count();
    assert_eq!(failed, 10);
    // Every failed report names its own payload, no cross-contamination.
    for report in &reports {
        if let Err(failure) = &report.outcome {
            assert!(failure.to_string().contains(&report.index.to_string()));
        }
    }
}

#[tokio::test]
async fn test_halved_aggregation_is_order_independent() {
    for _ in 0..20 {
        let total = aggregate(
            vec![1i64, 2, 3, 4, 5],
            split_halves,
            |part| async move {
                tokio::time::sleep(Duration::from_millis(fastrand::u64(0..3))).await;
                part.into_iter().sum::<i64>()
            },
            |a, b| a + b,
        )
        .await
        .unwrap();
        assert_eq!(total, 15);
    }
}

#[tokio::test]
async fn test_website_style_check() {
    let sites = vec![
        "http://good1.example".to_string(),
        "http://good2.example".to_string(),
        "http://bad.example".to_string(),
    ];
    let outcomes = check_all(sites, |url| async move {
        tokio::time::sleep(Duration::from_millis(fastrand::u64(0..3))).await;
        !url.contains("bad")
    })
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes["http://good1.example"], true);
    assert_eq!(outcomes["http://good2.example"], true);
    assert_eq!(outcomes["http://bad.example"], false);
}
