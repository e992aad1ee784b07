//! Fan-out/fan-in aggregation.
//!
//! Disjoint partitions of an input are mapped concurrently, each concurrent
//! unit sends exactly one partial on a shared channel, and the caller
//! receives exactly partition-count partials before combining. Arrival order
//! is completion order and carries no meaning.

use crate::core::errors::{DispatchError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Partition `items`, map every partition concurrently, and fold the partial
/// results into one value. Fails before spawning anything if the partition
/// scheme produces no partitions, since there would be no partial to seed
/// the fold.
pub async fn aggregate<T, U, P, M, Fut, C>(
    items: Vec<T>,
    partition: P,
    map: M,
    combine: C,
) -> Result<U>
where
    T: Send + 'static,
    U: Send + 'static,
    P: FnOnce(Vec<T>) -> Vec<Vec<T>>,
    M: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = U> + Send + 'static,
    C: Fn(U, U) -> U,
{
    let partitions = partition(items);
    if partitions.is_empty() {
        return Err(DispatchError::invalid_configuration(
            "aggregate requires at least one partition",
        ));
    }

    let expected = partitions.len();
    let (partial_tx, mut partial_rx) = mpsc::channel::<U>(expected);
    let map = Arc::new(map);

    for part in partitions {
        let partial_tx = partial_tx.clone();
        let map = Arc::clone(&map);
        tokio::spawn(async move {
            let partial = map(part).await;
            let _ = partial_tx.send(partial).await;
        });
    }
    drop(partial_tx);

    // Receive exactly as many partials as there are partitions. Receiving
    // fewer means a partition vanished; more is impossible by construction.
    let mut combined: Option<U> = None;
    for received in 0..expected {
        let partial = partial_rx.recv().await.ok_or_else(|| {
            DispatchError::channel(
                "aggregate.partials",
                format!("closed after {received} of {expected} partials"),
            )
        })?;
        combined = Some(match combined {
            Some(acc) => combine(acc, partial),
            None => partial,
        });
    }
    debug!(partitions = expected, "aggregation complete");
    combined.ok_or_else(|| DispatchError::internal("no partial survived the fold"))
}

/// Split into two halves, first half rounding down: `{1,2,3,4,5}` becomes
/// `{1,2}` and `{3,4,5}`.
pub fn split_halves<T>(mut items: Vec<T>) -> Vec<Vec<T>> {
    let tail = items.split_off(items.len() / 2);
    vec![items, tail]
}

/// One-item-per-partition specialization: evaluate an async predicate for
/// every item concurrently and map each item to its outcome. Keys are unique
/// and completion order is irrelevant.
pub async fn check_all<K, P, Fut>(items: Vec<K>, predicate: P) -> Result<HashMap<K, bool>>
where
    K: Eq + Hash + Clone + Send + 'static,
    P: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let expected = items.len();
    let (result_tx, mut result_rx) = mpsc::channel::<(K, bool)>(expected.max(1));
    let predicate = Arc::new(predicate);

    for item in items {
        let result_tx = result_tx.clone();
        let predicate = Arc::clone(&predicate);
        tokio::spawn(async move {
            let verdict = predicate(item.clone()).await;
            let _ = result_tx.send((item, verdict)).await;
        });
    }
    drop(result_tx);

    let mut outcomes = HashMap::with_capacity(expected);
    for received in 0..expected {
        let (item, verdict) = result_rx.recv().await.ok_or_else(|| {
            DispatchError::channel(
                "check_all.results",
                format!("closed after {received} of {expected} results"),
            )
        })?;
        outcomes.insert(item, verdict);
    }
    Ok(outcomes)
}
