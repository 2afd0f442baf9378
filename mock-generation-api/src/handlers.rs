use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

use crate::patterns::TestPattern;
use crate::responses::{complete_event, content_event, health_response, status_event, ResponseChunks};

/// Global request counter
static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);

/// Shared application state
pub struct AppState {
    pub chunks: ResponseChunks,
    pub chunk_delay: Duration,
}

/// POST /api/v1/{area}/{action}
///
/// Streams content events for any generation route. The request body is
/// only consulted for a subject to mention in the opening sentence.
///
/// Supports `X-Test-Pattern` for validation testing; see [`TestPattern`].
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path((area, action)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);

    let pattern = TestPattern::parse(headers.get("X-Test-Pattern").and_then(|v| v.to_str().ok()));
    tracing::debug!(%area, %action, pattern = pattern.name(), "Generation request");

    match pattern {
        TestPattern::Error(status) => error_response(status),
        TestPattern::Empty => StatusCode::OK.into_response(),
        TestPattern::Default => {
            let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            let subject = ["topic", "exam_name", "instructions"]
                .iter()
                .find_map(|key| payload.get(*key).and_then(Value::as_str))
                .unwrap_or("the requested topic");

            let mut events = vec![
                status_event("generating"),
                content_event(&format!("Generated {} content for {}.", area, subject)),
            ];
            events.extend(state.chunks.content_chunks());
            events.push(complete_event());

            sse_response(events, false, state.chunk_delay, pattern.name())
        }
        ref other => match other.script() {
            Some(script) => sse_response(script.events, script.abort, state.chunk_delay, other.name()),
            None => error_response(500),
        },
    }
}

/// Stream `events` with `delay` between them (the first is sent immediately).
/// With `abort`, the body fails after the last event so the connection is
/// reset instead of closed cleanly.
fn sse_response(events: Vec<Bytes>, abort: bool, delay: Duration, pattern: &'static str) -> Response {
    let paced = stream::iter(events)
        .enumerate()
        .then(move |(index, chunk)| async move {
            if index > 0 && delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            Ok::<Bytes, std::io::Error>(chunk)
        });

    let tail = stream::iter(abort.then(|| {
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            "aborted by test pattern",
        ))
    }));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-test-pattern-applied"), pattern),
        ],
        Body::from_stream(paced.chain(tail)),
    )
        .into_response()
}

fn error_response(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "detail": format!("Mock generation failure ({})", status.as_u16()) })),
    )
        .into_response()
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(health_response())
}

/// GET /stats
pub async fn stats() -> Json<Value> {
    Json(json!({
        "total_requests": REQUEST_COUNT.load(Ordering::Relaxed)
    }))
}

/// POST /stats/reset
pub async fn stats_reset() -> Json<Value> {
    REQUEST_COUNT.store(0, Ordering::Relaxed);
    Json(json!({
        "reset": true,
        "total_requests": 0
    }))
}
