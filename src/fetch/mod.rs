//! Cooperatively cancellable incremental fetch.
//!
//! A [`Source`] produces its payload chunk by chunk. [`fetch`] assembles the
//! chunks, checking the governing [`CancelSignal`] at every chunk boundary
//! and racing the in-flight chunk against it, so cancellation latency is
//! bounded by one increment. A cancelled fetch never surfaces a partial
//! payload, and [`fetch_into`] writes nothing downstream unless the fetch
//! completed.

use crate::cancel::{CancelReason, CancelSignal};
use crate::core::errors::{DispatchError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;
use tracing::debug;

/// An incremental data source. `Ok(None)` means exhausted.
#[async_trait]
pub trait Source: Send {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Drain `source` to completion unless `cancel` is raised first.
///
/// A signal already raised when the call is made returns `Cancelled` without
/// pulling a single chunk. When completion and cancellation race, whichever
/// the waiting caller observes first determines the outcome; once
/// `Cancelled` is returned no payload is ever delivered.
pub async fn fetch<S: Source>(mut source: S, cancel: &CancelSignal) -> Result<Bytes> {
    if cancel.is_cancelled() {
        let reason = cancel.reason().unwrap_or(CancelReason::Parent);
        debug!(%reason, "fetch refused, signal already raised");
        return Err(DispatchError::cancelled("fetch", reason));
    }

    let mut payload = BytesMut::new();
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                let reason = cancel.reason().unwrap_or(CancelReason::Parent);
                debug!(produced = payload.len(), %reason, "fetch cancelled mid-stream");
                return Err(DispatchError::cancelled("fetch", reason));
            }
            chunk = source.next_chunk() => chunk?,
        };
        match chunk {
            Some(chunk) => payload.extend_from_slice(&chunk),
            None => return Ok(payload.freeze()),
        }
    }
}

/// Fetch and write the payload to `writer`, returning the byte count.
///
/// The response boundary: nothing reaches the writer unless the fetch
/// completed, so a cancelled fetch produces no partial writes.
pub async fn fetch_into<S, W>(source: S, cancel: &CancelSignal, writer: &mut W) -> Result<usize>
where
    S: Source,
    W: AsyncWrite + Unpin + Send,
{
    let payload = fetch(source, cancel).await?;
    writer
        .write_all(&payload)
        .await
        .map_err(|e| DispatchError::io("response write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| DispatchError::io("response flush", e))?;
    Ok(payload.len())
}

/// Source yielding one byte of `data` per increment, each taking `delay` to
/// produce. Models a slow upstream for demos and tests.
#[derive(Debug, Clone)]
pub struct ThrottledSource {
    data: Bytes,
    cursor: usize,
    delay: Duration,
}

impl ThrottledSource {
    pub fn new(data: impl Into<Bytes>, delay: Duration) -> Self {
        Self {
            data: data.into(),
            cursor: 0,
            delay,
        }
    }
}

#[async_trait]
impl Source for ThrottledSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.cursor >= self.data.len() {
            return Ok(None);
        }
        sleep(self.delay).await;
        let chunk = self.data.slice(self.cursor..self.cursor + 1);
        self.cursor += 1;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn test_completes_without_cancellation() {
        let source = ThrottledSource::new("hello, world", Duration::from_millis(10));
        let cancel = CancelSignal::new();

        let payload = fetch(source, &cancel).await.unwrap();
        assert_eq!(payload, Bytes::from("hello, world"));
    }

    #[tokio::test]
    async fn test_raised_signal_prevents_any_work() {
        struct Untouchable;

        #[async_trait]
        impl Source for Untouchable {
            async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
                panic!("source must not be pulled when the signal is already raised");
            }
        }

        let cancel = CancelSignal::new();
        cancel.cancel(CancelReason::Explicit);

        let outcome = fetch(Untouchable, &cancel).await;
        assert!(matches!(
            outcome,
            Err(DispatchError::Cancelled {
                reason: CancelReason::Explicit,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_cancellation_drops_partial() {
        let source = ThrottledSource::new("twelve chars", Duration::from_millis(10));
        let cancel = CancelSignal::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(5)).await;
            canceller.cancel(CancelReason::Explicit);
        });

        let outcome = fetch(source, &cancel).await;
        assert!(matches!(outcome, Err(DispatchError::Cancelled { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_derived_signal_reports_cancelled_not_timeout() {
        let source = ThrottledSource::new("slow payload", Duration::from_millis(10));
        let cancel = CancelSignal::with_deadline(Duration::from_millis(35));

        match fetch(source, &cancel).await {
            Err(DispatchError::Cancelled {
                reason: CancelReason::DeadlineElapsed(limit),
                ..
            }) => assert_eq!(limit, Duration::from_millis(35)),
            other => panic!("expected cancelled, got {other:?}"),
        }
    }
}
