//! Caller authentication.
//!
//! Sessions are owned by an external auth provider; the relay only needs to
//! resolve a request to an identity or reject it.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::error::RelayError;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

/// Resolves request headers to an [`Identity`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, RelayError>;
}

/// Accepts a fixed set of session tokens.
pub struct StaticTokenAuthenticator {
    tokens: Vec<String>,
    cookie_name: String,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: Vec<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            tokens,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        if config.tokens.is_empty() {
            tracing::warn!("No auth tokens configured; every relay request will be rejected");
        }
        Self::new(config.tokens.clone(), config.cookie_name.clone())
    }

    fn verify(&self, credential: &str) -> Option<usize> {
        self.tokens
            .iter()
            .position(|t| t.as_bytes().ct_eq(credential.as_bytes()).into())
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, RelayError> {
        let credential = credential_from_headers(headers, &self.cookie_name)
            .ok_or_else(|| RelayError::Auth("No session credential provided".to_string()))?;

        match self.verify(credential) {
            Some(index) => Ok(Identity {
                subject: format!("token-{}", index),
            }),
            None => Err(RelayError::Auth("Invalid session credential".to_string())),
        }
    }
}

/// Find the caller's credential: `Authorization: Bearer` first, then the
/// session cookie.
pub fn credential_from_headers<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty());

    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value)
}
