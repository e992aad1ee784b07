//! Level-triggered, broadcastable cancellation.
//!
//! A [`CancelSignal`] stays raised once raised, can be observed by any number
//! of tasks (poll with [`CancelSignal::is_cancelled`] or block on
//! [`CancelSignal::cancelled`]), and carries a terminal [`CancelReason`].
//! Signals compose: a child raised by its parent reports `Parent`, a child
//! with an attached deadline reports `DeadlineElapsed` when the deadline
//! fires first.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a signal was raised. Recorded once, first writer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The owner called [`CancelSignal::cancel`].
    Explicit,
    /// An attached deadline elapsed.
    DeadlineElapsed(Duration),
    /// A parent signal fired.
    Parent,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit cancel"),
            Self::DeadlineElapsed(limit) => write!(f, "deadline of {limit:?} elapsed"),
            Self::Parent => write!(f, "parent cancelled"),
        }
    }
}

/// Broadcast cancellation signal threaded through every blocking operation
/// of the core.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// New signal that raises itself once `limit` elapses.
    pub fn with_deadline(limit: Duration) -> Self {
        let signal = Self::new();
        signal.spawn_deadline_watcher(limit);
        signal
    }

    /// Derive a child signal: fires when this signal fires, or when the
    /// child itself is cancelled. The parent is unaffected by the child.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// Derive a child that additionally fires when `limit` elapses,
    /// whichever comes first.
    pub fn child_with_deadline(&self, limit: Duration) -> Self {
        let child = self.child();
        child.spawn_deadline_watcher(limit);
        child
    }

    /// Raise the signal. Idempotent; the first recorded reason sticks.
    pub fn cancel(&self, reason: CancelReason) {
        // Reason is published before the token wakes observers, so anyone
        // woken by `cancelled()` sees it.
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Terminal reason, if the signal has been raised. A signal raised only
    /// through its parent reports [`CancelReason::Parent`].
    pub fn reason(&self) -> Option<CancelReason> {
        if let Some(reason) = self.reason.get() {
            Some(*reason)
        } else if self.token.is_cancelled() {
            Some(CancelReason::Parent)
        } else {
            None
        }
    }

    /// Resolves once the signal is raised. Level-triggered: resolves
    /// immediately if already raised.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    fn spawn_deadline_watcher(&self, limit: Duration) {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = signal.token.cancelled() => {}
                _ = sleep(limit) => {
                    debug!(?limit, "cancel deadline elapsed");
                    signal.cancel(CancelReason::DeadlineElapsed(limit));
                }
            }
        });
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
