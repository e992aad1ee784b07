//! taskmill: a single-process, in-memory task-dispatch and cancellation core.
//!
//! Four callable operations make up the external surface:
//! [`run_pool()`] (fixed worker pool draining a batch), [`aggregate()`]
//! (fan-out/fan-in reduction), [`race()`] (first responder wins, bounded by
//! a deadline), and [`fetch()`] (incremental production that stops promptly
//! on cancellation). All of them take their dependencies — worker counts,
//! queues, signals — as explicit parameters; there is no global state.

// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
}

pub mod aggregate;
pub mod cancel;
pub mod fetch;
pub mod pool;
pub mod race;
pub mod sync;

// Re-exports for convenience
pub use crate::core::config::PoolConfig;
pub use crate::core::errors::{DispatchError, Result, TaskFailure};

pub use aggregate::{aggregate, check_all, split_halves};
pub use cancel::{CancelReason, CancelSignal};
pub use fetch::{fetch, fetch_into, Source, ThrottledSource};
pub use pool::{run_pool, Task, TaskReport, WorkerPool};
pub use race::{race, Contender, Winner};
pub use sync::SharedCounter;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Adder {
        lhs: i64,
        rhs: i64,
    }

    #[async_trait]
    impl Task for Adder {
        type Output = i64;

        async fn run(&self) -> std::result::Result<i64, TaskFailure> {
            Ok(self.lhs + self.rhs)
        }
    }

    #[tokio::test]
    async fn test_pool_and_aggregate_end_to_end() {
        // Batch through the pool, then reduce the outputs through the
        // aggregator, exercising both halves of the dispatch core.
        let tasks = (1..=5).map(|n| Adder { lhs: n, rhs: 0 }).collect();
        let reports = run_pool(2, tasks).await.unwrap();
        assert_eq!(reports.len(), 5);

        let outputs: Vec<i64> = reports
            .into_iter()
            .map(|report| report.into_result().unwrap())
            .collect();
        let total = aggregate(outputs, split_halves, |part| async move {
            part.into_iter().sum::<i64>()
        }, |a, b| a + b)
        .await
        .unwrap();
        assert_eq!(total, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_threads_through_pool_and_fetch() {
        let cancel = CancelSignal::with_deadline(Duration::from_millis(5));
        let source = ThrottledSource::new("never finishes", Duration::from_millis(10));

        let outcome = fetch(source, &cancel).await;
        assert!(matches!(outcome, Err(DispatchError::Cancelled { .. })));
    }
}
