//! The per-request pump between an upstream byte stream and the caller.
//!
//! One task owns the upstream stream and its [`SseTranscoder`]. Output goes
//! through a channel of capacity 1, so the next upstream read is not issued
//! until the caller has taken the previous chunk. The response body owns a
//! cancellation drop guard; a disconnecting caller drops the body, which
//! cancels the task and releases the upstream connection.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;

use super::sse::LinePolicy;
use super::transcoder::SseTranscoder;
use crate::backend::ByteStream;
use crate::error::RelayError;
use crate::metrics::{self, StreamOutcome, Timer};
use crate::shutdown::StreamGuard;

/// Everything the pump needs besides the upstream stream.
pub struct RelayContext {
    pub operation: &'static str,
    pub backend: &'static str,
    pub policy: LinePolicy,
    /// Started when the upstream call was issued.
    pub timer: Timer,
    pub guard: StreamGuard,
}

/// Response body fed by the pump task.
pub struct RelayBody {
    rx: mpsc::Receiver<Result<Bytes, RelayError>>,
    _cancel: DropGuard,
}

impl Stream for RelayBody {
    type Item = Result<Bytes, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Spawn the pump for one invocation and return the caller-facing body.
pub fn spawn_relay(upstream: ByteStream, ctx: RelayContext) -> RelayBody {
    let (tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    tokio::spawn(pump(upstream, tx, cancel.clone(), ctx).instrument(tracing::Span::current()));

    RelayBody {
        rx,
        _cancel: cancel.drop_guard(),
    }
}

async fn pump(
    mut upstream: ByteStream,
    tx: mpsc::Sender<Result<Bytes, RelayError>>,
    cancel: CancellationToken,
    ctx: RelayContext,
) {
    let RelayContext {
        operation,
        backend,
        policy,
        timer,
        guard,
    } = ctx;

    let mut shutdown_rx = guard.subscribe();
    let mut transcoder = SseTranscoder::new(policy);
    let mut first_byte = true;

    let outcome = loop {
        let next = tokio::select! {
            biased;

            _ = cancel.cancelled() => break StreamOutcome::ClientDisconnected,

            _ = shutdown_signaled(&mut shutdown_rx) => {
                tracing::info!("Shutdown signaled, aborting stream");
                let _ = deliver(&tx, &cancel, Err(RelayError::Shutdown)).await;
                break StreamOutcome::Shutdown;
            }

            next = upstream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if first_byte {
                    metrics::record_upstream_ttfb(backend, timer.elapsed());
                    first_byte = false;
                }
                if !deliver_all(&tx, &cancel, transcoder.feed(&chunk)).await {
                    break StreamOutcome::ClientDisconnected;
                }
            }
            Some(Err(e)) => {
                metrics::record_upstream_error(backend, e.kind());
                tracing::warn!(error = %e, "Upstream read failed mid-stream");
                let _ = deliver(&tx, &cancel, Err(e)).await;
                break StreamOutcome::UpstreamFailed;
            }
            None => {
                if !deliver_all(&tx, &cancel, transcoder.finish()).await {
                    break StreamOutcome::ClientDisconnected;
                }
                break StreamOutcome::Completed;
            }
        }
    };

    // Release the upstream connection before reporting.
    drop(upstream);

    let stats = transcoder.stats();
    metrics::record_malformed_events(operation, stats.malformed);
    metrics::record_stream_finished(operation, outcome, timer.elapsed());

    tracing::info!(
        stream_id = guard.id(),
        outcome = outcome.as_str(),
        chunks = stats.chunks_out,
        bytes = stats.bytes_out,
        malformed = stats.malformed,
        duration_ms = timer.elapsed().as_millis() as u64,
        "Stream finished"
    );
}

async fn shutdown_signaled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

async fn deliver_all(
    tx: &mpsc::Sender<Result<Bytes, RelayError>>,
    cancel: &CancellationToken,
    chunks: Vec<Bytes>,
) -> bool {
    for chunk in chunks {
        let len = chunk.len() as u64;
        if !deliver(tx, cancel, Ok(chunk)).await {
            return false;
        }
        metrics::record_chunk_forwarded(len);
    }
    true
}

/// Hand one item to the caller, waiting for room. Returns false once the
/// caller is gone.
async fn deliver(
    tx: &mpsc::Sender<Result<Bytes, RelayError>>,
    cancel: &CancellationToken,
    item: Result<Bytes, RelayError>,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}
