//! Walkthrough of the dispatch core: a pooled batch, a halved aggregation,
//! a bounded race, and a fetch cut short by its signal.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use taskmill::{
    aggregate, fetch, race, run_pool, split_halves, CancelSignal, Contender, Task, TaskFailure,
    ThrottledSource,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

struct Adder {
    lhs: i64,
    rhs: i64,
}

#[async_trait]
impl Task for Adder {
    type Output = i64;

    async fn run(&self) -> std::result::Result<i64, TaskFailure> {
        tokio::time::sleep(Duration::from_millis(fastrand::u64(0..200))).await;
        Ok(self.lhs + self.rhs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Fixed pool draining a batch of adders.
    let tasks = (0..8)
        .map(|n| Adder {
            lhs: fastrand::i64(0..100),
            rhs: n,
        })
        .collect();
    let reports = run_pool(3, tasks).await?;
    for report in &reports {
        info!(task = report.index, outcome = ?report.outcome, "pool report");
    }

    // Fan-out/fan-in over two halves.
    let total = aggregate(
        vec![1i64, 2, 3, 4, 5],
        split_halves,
        |part| async move { part.into_iter().sum::<i64>() },
        |a, b| a + b,
    )
    .await?;
    info!(total, "halved aggregation");

    // First responder wins, deadline well clear of both.
    let winner = race(
        vec![
            Contender::new("tortoise", |_| async {
                tokio::time::sleep(Duration::from_millis(150)).await;
            }),
            Contender::new("hare", |_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }),
        ],
        Duration::from_secs(10),
    )
    .await?;
    info!(winner = %winner.name, "race resolved");

    // A slow fetch cancelled by a deadline-derived signal.
    let cancel = CancelSignal::with_deadline(Duration::from_millis(40));
    let source = ThrottledSource::new("this payload never fully arrives", Duration::from_millis(10));
    match fetch(source, &cancel).await {
        Ok(payload) => info!(bytes = payload.len(), "fetch completed"),
        Err(e) => info!(error = %e, "fetch stopped"),
    }

    Ok(())
}
