use crate::cancel::CancelReason;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for the dispatch core.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A task's own computation failed. Carried inside its report, never
    /// fatal to the pool.
    #[error("task {index} failed")]
    Task {
        index: usize,
        #[source]
        source: TaskFailure,
    },

    /// A deadline elapsed before any completion.
    #[error("operation timed out: {operation} (deadline: {timeout:?})")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// An external signal stopped the operation. Distinct from `Timeout`
    /// even when the signal itself was raised by a deadline further up.
    #[error("operation cancelled: {operation} ({reason})")]
    Cancelled {
        operation: String,
        reason: CancelReason,
    },

    /// Channel endpoint closed out from under an operation.
    #[error("channel error: {channel} - {message}")]
    Channel { channel: String, message: String },

    /// Configuration rejected before any work started.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// IO failure at the response boundary.
    #[error("io operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Invariant violation inside the core.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn task(index: usize, source: TaskFailure) -> Self {
        Self::Task { index, source }
    }

    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    pub fn cancelled(operation: impl Into<String>, reason: CancelReason) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            reason,
        }
    }

    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
            message: message.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the whole operation could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Io { .. } => true,
            Self::Task { source, .. } => source.is_recoverable(),
            Self::Cancelled { .. } => false,
            Self::Channel { .. } | Self::InvalidConfiguration(_) | Self::Internal(_) => false,
        }
    }

    /// Error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Task { .. } => "task",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Channel { .. } => "channel",
            Self::InvalidConfiguration(_) => "configuration",
            Self::Io { .. } => "io",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Outcome of a single task's computation. Recovered locally by the worker
/// that ran it and delivered inside the task's report; sibling tasks never
/// observe it.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("{reason}")]
    Failed { reason: String },

    #[error("timed out after {limit:?}")]
    TimedOut { limit: Duration },

    #[error("cancelled before dispatch ({reason})")]
    Cancelled { reason: CancelReason },
}

impl TaskFailure {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn timed_out(limit: Duration) -> Self {
        Self::TimedOut { limit }
    }

    pub fn cancelled(reason: CancelReason) -> Self {
        Self::Cancelled { reason }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Failed { .. } => false,
            Self::TimedOut { .. } => true,
            Self::Cancelled { .. } => false,
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        Self::io("io_operation", err)
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for DispatchError {
    fn from(err: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::channel("mpsc", err.to_string())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for DispatchError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::channel("oneshot", "sender dropped before completion")
    }
}

impl From<tokio::task::JoinError> for DispatchError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("worker join failed: {err}"))
    }
}
