//! Bearer credential providers.
//!
//! A credential is requested fresh for every API call so that rotated
//! tokens are picked up without rebuilding the client.

use std::env;

use async_trait::async_trait;

use crate::errors::ApiError;

/// Error message used when no credential is available.
pub const NOT_AUTHENTICATED: &str = "User is not authenticated.";

/// Source of bearer tokens for API calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, ApiError>;
}

/// A fixed token, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, ApiError> {
        non_empty(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self) -> Result<String, ApiError> {
        non_empty(env::var(&self.var).ok())
    }
}

fn non_empty(token: Option<String>) -> Result<String, ApiError> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(ApiError::Unauthenticated(NOT_AUTHENTICATED.to_string())),
    }
}
