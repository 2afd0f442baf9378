//! SSE re-streaming relay for generation backends.
//!
//! Authenticates callers, maps their camelCase requests onto the backend's
//! snake_case API, and re-streams the backend's Server-Sent-Events as the
//! raw text carried inside its `content` events.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod operations;
pub mod server;
pub mod shutdown;
pub mod streaming;

pub use config::Config;
pub use error::{RelayError, Result, ServerError};
