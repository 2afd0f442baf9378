//! Route table and shared handler state.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{health, ready, relay};
use crate::auth::Authenticator;
use crate::backend::GenerationBackend;
use crate::operations::{
    AssessmentGeneration, ComicGeneration, ContentGeneration, ExamGeneration, VideoScript,
};
use crate::shutdown::ShutdownCoordinator;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn GenerationBackend>,
    pub auth: Arc<dyn Authenticator>,
    pub shutdown: ShutdownCoordinator,
    pub max_streams: usize,
}

/// Build the relay router.
///
/// The body cap surfaces as an extractor rejection, which relay handlers
/// report only after the caller has authenticated.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/content-generation", post(relay::<ContentGeneration>))
        .route("/api/assessment-generation", post(relay::<AssessmentGeneration>))
        .route("/api/exam-generation", post(relay::<ExamGeneration>))
        .route(
            "/api/media-toolkit/comic-generation",
            post(relay::<ComicGeneration>),
        )
        .route("/api/media-toolkit/video-script", post(relay::<VideoScript>))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
