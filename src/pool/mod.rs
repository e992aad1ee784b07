//! Fixed-size worker pool with exactly-once dispatch.
//!
//! A batch of [`Task`]s is enqueued on a bounded job queue, the queue is
//! closed, and N long-lived workers drain it, publishing one [`TaskReport`]
//! per task on a result channel sized to the batch. Reports arrive in
//! completion order, not submission order. A task's failure is carried in
//! its report and never stops the pool.

use crate::cancel::{CancelReason, CancelSignal};
use crate::core::config::PoolConfig;
use crate::core::errors::{DispatchError, Result, TaskFailure};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A unit of work producing a typed result or failure. Immutable once
/// submitted; ownership of the outcome moves to the result channel.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn run(&self) -> std::result::Result<Self::Output, TaskFailure>;
}

/// Outcome of one submitted task. `index` is the task's position in the
/// submitted batch; exactly one report exists per submitted task.
#[derive(Debug)]
pub struct TaskReport<T> {
    pub index: usize,
    pub outcome: std::result::Result<T, TaskFailure>,
}

impl<T> TaskReport<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Collapse into a plain result, tagging a failure with its task index.
    pub fn into_result(self) -> Result<T> {
        self.outcome
            .map_err(|failure| DispatchError::task(self.index, failure))
    }
}

/// Fixed set of workers consuming tasks from a shared queue.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Run a batch to completion and return one report per task, in
    /// completion order.
    pub async fn run<T: Task>(&self, tasks: Vec<T>) -> Result<Vec<TaskReport<T::Output>>> {
        self.run_inner(tasks, None).await
    }

    /// Like [`WorkerPool::run`], but workers observe `cancel` between tasks:
    /// once the signal is raised, tasks still waiting in the queue are
    /// reported as cancelled instead of executed. Tasks already running
    /// finish and report normally. The batch still yields exactly one report
    /// per task.
    pub async fn run_with_cancel<T: Task>(
        &self,
        tasks: Vec<T>,
        cancel: &CancelSignal,
    ) -> Result<Vec<TaskReport<T::Output>>> {
        self.run_inner(tasks, Some(cancel.clone())).await
    }

    async fn run_inner<T: Task>(
        &self,
        tasks: Vec<T>,
        cancel: Option<CancelSignal>,
    ) -> Result<Vec<TaskReport<T::Output>>> {
        let total = tasks.len();
        let (job_tx, job_rx) = mpsc::channel::<(usize, T)>(self.config.queue_capacity);
        // Sized to the batch so producer and consumer can share one control
        // flow without deadlock.
        let (result_tx, mut result_rx) = mpsc::channel::<TaskReport<T::Output>>(total.max(1));

        let job_rx = Arc::new(Mutex::new(job_rx));
        let workers: Vec<JoinHandle<()>> = (0..self.config.workers)
            .map(|worker_id| {
                let jobs = Arc::clone(&job_rx);
                let results = result_tx.clone();
                let cancel = cancel.clone();
                let task_timeout = self.config.task_timeout;
                tokio::spawn(worker_loop(worker_id, jobs, results, cancel, task_timeout))
            })
            .collect();
        drop(result_tx);

        // Submission: enqueue the whole batch, then close the queue by
        // dropping the sender. Workers terminate once it is drained.
        for (index, task) in tasks.into_iter().enumerate() {
            job_tx.send((index, task)).await?;
        }
        drop(job_tx);

        let mut reports = Vec::with_capacity(total);
        while let Some(report) = result_rx.recv().await {
            reports.push(report);
        }

        for worker in workers {
            worker.await?;
        }

        if reports.len() != total {
            return Err(DispatchError::internal(format!(
                "submitted {total} tasks but drained {} reports",
                reports.len()
            )));
        }
        Ok(reports)
    }
}

async fn worker_loop<T: Task>(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<(usize, T)>>>,
    results: mpsc::Sender<TaskReport<T::Output>>,
    cancel: Option<CancelSignal>,
    task_timeout: Option<Duration>,
) {
    debug!(worker = worker_id, "worker started");
    loop {
        // Guard scope covers only the receive; execution happens unlocked so
        // the other workers keep consuming.
        let next = { jobs.lock().await.recv().await };
        let Some((index, task)) = next else {
            break;
        };

        let outcome = match cancel.as_ref().filter(|signal| signal.is_cancelled()) {
            Some(signal) => {
                let reason = signal.reason().unwrap_or(CancelReason::Explicit);
                debug!(worker = worker_id, task = index, %reason, "task skipped");
                Err(TaskFailure::cancelled(reason))
            }
            None => execute(&task, task_timeout).await,
        };

        if let Err(failure) = &outcome {
            warn!(worker = worker_id, task = index, error = %failure, "task failed");
        }
        if results.send(TaskReport { index, outcome }).await.is_err() {
            // Caller stopped draining; nothing left to deliver to.
            break;
        }
    }
    debug!(worker = worker_id, "worker stopped");
}

async fn execute<T: Task>(
    task: &T,
    limit: Option<Duration>,
) -> std::result::Result<T::Output, TaskFailure> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, task.run()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskFailure::timed_out(limit)),
        },
        None => task.run().await,
    }
}

/// Convenience entry point: run `tasks` on a fresh pool of `workers` workers,
/// blocking until every report has been drained.
pub async fn run_pool<T: Task>(
    workers: usize,
    tasks: Vec<T>,
) -> Result<Vec<TaskReport<T::Output>>> {
    WorkerPool::new(PoolConfig::with_workers(workers))?
        .run(tasks)
        .await
}
