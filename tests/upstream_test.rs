//! End-to-end tests against a real HTTP upstream.
//!
//! A small axum app bound to 127.0.0.1:0 stands in for the generation
//! backend. It records what it received and answers according to the path,
//! so the reqwest client, the error extraction and the byte-level parser are
//! all exercised over real sockets.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::stream;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use stream_relay_rs::auth::StaticTokenAuthenticator;
use stream_relay_rs::backend::{build_streaming_client, HttpBackend};
use stream_relay_rs::config::UpstreamConfig;
use stream_relay_rs::server::{router, AppState};
use stream_relay_rs::shutdown::ShutdownCoordinator;

const TOKEN: &str = "e2e-token";

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    query: Option<String>,
    request_id: Option<String>,
    payload: Value,
}

#[derive(Clone, Default)]
struct Upstream {
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl Upstream {
    fn last(&self) -> Captured {
        self.captured.lock().unwrap().last().cloned().unwrap()
    }
}

/// Answers by the last path segment of the upstream route.
async fn upstream_handler(
    State(upstream): State<Upstream>,
    Path((area, action)): Path<(String, String)>,
    headers: HeaderMap,
    request: Request<Body>,
) -> Response {
    let query = request.uri().query().map(str::to_string);
    let body = to_bytes(request.into_body(), usize::MAX).await.unwrap();

    upstream.captured.lock().unwrap().push(Captured {
        path: format!("/api/v1/{}/{}", area, action),
        query,
        request_id: headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        payload: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    match action.as_str() {
        // Split mid-line, mid-JSON and inside a multi-byte character.
        "generate" => {
            let event = "data: {\"type\":\"content\",\"data\":{\"chunk\":\"Hello \"}}\r\n\r\n\
                         data: {\"type\":\"content\",\"data\":{\"chunk\":\"wörld\"}}\r\n\r\n"
                .as_bytes()
                .to_vec();
            let split_utf8 = event.iter().position(|b| *b == 0xC3).unwrap() + 1;
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::copy_from_slice(&event[..10])),
                Ok(Bytes::copy_from_slice(&event[10..split_utf8])),
                Ok(Bytes::copy_from_slice(&event[split_utf8..])),
            ];
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(stream::iter(chunks)),
            )
                .into_response()
        }
        "comic-story" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "num_panels must be at most 12" })),
        )
            .into_response(),
        "video-script" => (StatusCode::BAD_GATEWAY, "model overloaded").into_response(),
        "quiz" => StatusCode::OK.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_upstream() -> (String, Upstream) {
    let upstream = Upstream::default();
    let app = Router::new()
        .route("/api/v1/:area/:action", post(upstream_handler))
        .with_state(upstream.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), upstream)
}

fn relay_app(base_url: &str) -> Router {
    let config = UpstreamConfig {
        base_url: base_url.to_string(),
        connect_timeout_secs: 2,
        ..UpstreamConfig::default()
    };
    let client = build_streaming_client(&config).unwrap();

    let state = AppState {
        backend: Arc::new(HttpBackend::new(client, base_url)),
        auth: Arc::new(StaticTokenAuthenticator::new(
            vec![TOKEN.to_string()],
            "session_token",
        )),
        shutdown: ShutdownCoordinator::new(),
        max_streams: 8,
    };
    router(state, 64 * 1024)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-request-id", "req-42")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_body(response: Response) -> String {
    let bytes = tokio::time::timeout(
        Duration::from_secs(5),
        to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .unwrap()
    .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_relay_streams_from_http_upstream() {
    let (base_url, upstream) = start_upstream().await;

    let request = json!({
        "grade": 8,
        "subject": "History",
        "language": "English",
        "topic": "The printing press",
        "learningObjective": "Explain its impact",
        "mcqCount": 4,
        "includeAnswerKey": false,
    });

    let response = relay_app(&base_url)
        .oneshot(post_json("/api/assessment-generation", request))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(read_body(response).await, "Hello wörld");

    let captured = upstream.last();
    assert_eq!(captured.path, "/api/v1/assessment/generate");
    assert_eq!(captured.query.as_deref(), Some("stream=true"));
    assert_eq!(captured.request_id.as_deref(), Some("req-42"));
    assert_eq!(
        captured.payload,
        json!({
            "grade": "8",
            "subject": "History",
            "language": "English",
            "topic": "The printing press",
            "learning_objective": "Explain its impact",
            "number_of_mcq": 4,
            "include_answer_key": false,
        })
    );
}

#[tokio::test]
async fn test_upstream_detail_passed_through() {
    let (base_url, _upstream) = start_upstream().await;

    let request = json!({
        "instructions": "A day at the zoo",
        "grade": "2",
        "language": "English",
        "numPanels": 40,
    });

    let response = relay_app(&base_url)
        .oneshot(post_json("/api/media-toolkit/comic-generation", request))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = serde_json::from_str(&read_body(response).await).unwrap();
    assert_eq!(body, json!({ "error": "num_panels must be at most 12" }));
}

#[tokio::test]
async fn test_upstream_raw_text_error_passed_through() {
    let (base_url, _upstream) = start_upstream().await;

    let request = json!({
        "topic": "Tides",
        "grade": "7",
        "language": "English",
    });

    let response = relay_app(&base_url)
        .oneshot(post_json("/api/media-toolkit/video-script", request))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&read_body(response).await).unwrap();
    assert_eq!(body["error"], "model overloaded");
}

#[tokio::test]
async fn test_empty_upstream_body_is_an_error() {
    let (base_url, _upstream) = start_upstream().await;

    let request = json!({
        "grade": "4",
        "subject": "Math",
        "language": "English",
        "topic": "Fractions",
        "learningObjective": "Compare fractions",
        "contentType": "quiz",
    });

    let response = relay_app(&base_url)
        .oneshot(post_json("/api/content-generation", request))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&read_body(response).await).unwrap();
    assert_eq!(body["error"], "No response body from upstream");
}

#[tokio::test]
async fn test_unreachable_upstream_is_500() {
    // Bind and drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let response = relay_app(&base_url)
        .oneshot(post_json(
            "/api/exam-generation",
            json!({
                "organisationName": "Riverside High",
                "examName": "Final",
                "duration": "2h",
                "topics": ["Optics"],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&read_body(response).await).unwrap();
    assert_eq!(body["error"], "Failed to reach generation service");
}
