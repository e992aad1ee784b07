//! First-responder-wins racing with a deadline.
//!
//! Every contender runs as its own tokio task and signals completion through
//! a dedicated oneshot marker carrying no payload. The race waits on the
//! first of: any marker resolving, or the deadline elapsing. Near-
//! simultaneous completions resolve to whichever marker the wait primitive
//! observes first; that tie-break is intentionally non-deterministic.
//!
//! Once the race resolves, the losing contenders' child [`CancelSignal`]s
//! are raised so cooperative losers can stop early. A contender that ignores
//! its signal simply runs to completion in the background and its outcome is
//! discarded.

use crate::cancel::{CancelReason, CancelSignal};
use crate::core::errors::{DispatchError, Result};
use futures::future::{select_all, BoxFuture};
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A named competing operation. The closure receives the contender's own
/// child [`CancelSignal`], raised when the race resolves without it.
pub struct Contender {
    name: String,
    op: Box<dyn FnOnce(CancelSignal) -> BoxFuture<'static, ()> + Send>,
}

impl Contender {
    pub fn new<F, Fut>(name: impl Into<String>, op: F) -> Self
    where
        F: FnOnce(CancelSignal) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            op: Box::new(move |signal| Box::pin(op(signal))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Identity of the first contender to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub index: usize,
    pub name: String,
}

/// Start every contender and return the first to complete, or
/// [`DispatchError::Timeout`] if the deadline elapses with no completion.
pub async fn race(contenders: Vec<Contender>, limit: Duration) -> Result<Winner> {
    if contenders.is_empty() {
        return Err(DispatchError::invalid_configuration(
            "race requires at least one contender",
        ));
    }

    let cancel = CancelSignal::new();
    let mut names = Vec::with_capacity(contenders.len());
    let mut markers: Vec<BoxFuture<'static, Option<usize>>> =
        Vec::with_capacity(contenders.len());

    for (index, contender) in contenders.into_iter().enumerate() {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let op = (contender.op)(cancel.child());
        names.push(contender.name);
        tokio::spawn(async move {
            op.await;
            let _ = done_tx.send(());
        });
        // A contender that panics drops its marker; the race skips it and
        // keeps waiting on the rest.
        markers.push(Box::pin(async move { done_rx.await.ok().map(|_| index) }));
    }

    let resolved = tokio::time::timeout(limit, async move {
        let mut pending = markers;
        loop {
            let (first, _, rest) = select_all(pending).await;
            match first {
                Some(index) => return Some(index),
                None if rest.is_empty() => return None,
                None => pending = rest,
            }
        }
    })
    .await;

    match resolved {
        Ok(Some(index)) => {
            // Losers stop early if they honor their signal.
            cancel.cancel(CancelReason::Explicit);
            let name = names[index].clone();
            debug!(winner = %name, index, "race resolved");
            Ok(Winner { index, name })
        }
        Ok(None) => {
            cancel.cancel(CancelReason::Explicit);
            warn!("every contender dropped its completion marker");
            Err(DispatchError::channel(
                "race.markers",
                "every contender dropped its completion marker",
            ))
        }
        Err(_) => {
            cancel.cancel(CancelReason::DeadlineElapsed(limit));
            debug!(?limit, "race deadline elapsed with no winner");
            Err(DispatchError::timeout("race", limit))
        }
    }
}
