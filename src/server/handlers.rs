//! Request handlers.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::Instrument;

use super::router::AppState;
use crate::backend::UpstreamRequest;
use crate::error::RelayError;
use crate::metrics::{self, Timer};
use crate::operations::{prepare, GenerationOperation};
use crate::streaming::{spawn_relay, RelayContext};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Relay one generation request for operation `O`.
pub async fn relay<O: GenerationOperation>(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = request_id(&headers);
    let span = tracing::info_span!(
        "relay",
        operation = O::NAME,
        request_id = %request_id,
        subject = tracing::field::Empty,
    );

    async move {
        metrics::record_request(O::NAME);

        match open_relay::<O>(&state, &headers, body, &request_id).await {
            Ok(response) => response,
            Err(err) => {
                metrics::record_rejected(O::NAME, err.kind());
                log_rejection(&err);
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn open_relay<O: GenerationOperation>(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
    request_id: &str,
) -> Result<Response, RelayError> {
    let identity = state.auth.authenticate(headers).await?;
    tracing::Span::current().record("subject", identity.subject.as_str());

    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => RelayError::PayloadTooLarge,
        _ => RelayError::Validation(rejection.body_text()),
    })?;

    let prepared = prepare::<O>(&body)?;
    let guard = state.shutdown.try_register_stream(state.max_streams)?;

    let backend = state.backend.name();
    let timer = Timer::new();
    metrics::record_upstream_request(backend);

    let upstream = state
        .backend
        .open_stream(UpstreamRequest {
            operation: prepared.operation,
            path: prepared.path,
            payload: prepared.payload,
            request_id: request_id.to_string(),
        })
        .await
        .map_err(|e| {
            metrics::record_upstream_error(backend, e.kind());
            e
        })?;

    tracing::info!(
        stream_id = guard.id(),
        path = prepared.path,
        backend,
        "Upstream stream opened"
    );

    let body = spawn_relay(
        upstream,
        RelayContext {
            operation: prepared.operation,
            backend,
            policy: prepared.policy,
            timer,
            guard,
        },
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, prepared.content_type),
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        [(X_REQUEST_ID, request_id.to_string())],
        Body::from_stream(body),
    )
        .into_response())
}

/// Liveness: the process is up and serving.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "backend": state.backend.name(),
        "active_streams": state.shutdown.active_streams(),
    }))
}

/// Readiness: the backend answers its health check and we are not draining.
pub async fn ready(State(state): State<AppState>) -> Response {
    let backend = state.backend.name();

    if state.shutdown.is_shutdown() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "shutting_down", "backend": backend })),
        )
            .into_response();
    }

    match state.backend.health_check().await {
        Ok(()) => Json(json!({ "status": "ready", "backend": backend })).into_response(),
        Err(e) => {
            tracing::warn!(backend, error = %e, "Backend health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "backend": backend,
                    "error": e.client_message(),
                })),
            )
                .into_response()
        }
    }
}

/// Caller-supplied request ID if it is usable, otherwise a fresh one.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| format!("relay-{}", NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)))
}

fn log_rejection(err: &RelayError) {
    match err {
        RelayError::Auth(reason) => tracing::info!(reason = %reason, "Request not authenticated"),
        RelayError::Validation(_) | RelayError::PayloadTooLarge => {
            tracing::debug!(error = %err, "Request rejected")
        }
        RelayError::Overloaded | RelayError::Shutdown => {
            tracing::warn!(error = %err, "Stream not admitted")
        }
        RelayError::Upstream { status, message } => {
            tracing::warn!(status, message = %message, "Upstream rejected request")
        }
        RelayError::Transport(_) | RelayError::MissingBody | RelayError::Config(_) => {
            tracing::error!(error = %err, "Upstream call failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static(" abc-123 "));
        assert_eq!(request_id(&headers), "abc-123");
    }

    #[test]
    fn test_request_id_generated() {
        let first = request_id(&HeaderMap::new());
        let second = request_id(&HeaderMap::new());
        assert!(first.starts_with("relay-"));
        assert_ne!(first, second);
    }
}
