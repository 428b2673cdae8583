//! Configuration module for the PDF chat client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use crate::store::{
    SendFailurePolicy, StaleUpdatePolicy, StoreSettings, DEFAULT_PODCAST_RESET_DELAY,
    DEFAULT_POLL_INTERVAL, DEFAULT_UPLOAD_RESET_DELAY,
};

/// Environment variable holding the bearer token.
pub const TOKEN_VAR: &str = "PDFCHAT_API_TOKEN";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend API
    pub api_base_url: String,
    /// Bearer token, if one was configured at startup
    pub api_token: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub upload_reset_delay: Duration,
    pub podcast_reset_delay: Duration,
    /// Unset means poll until a terminal status
    pub max_poll_attempts: Option<u32>,
    pub send_failure: SendFailurePolicy,
    pub stale_updates: StaleUpdatePolicy,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("PDFCHAT_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api".to_string());

        let api_token = env::var(TOKEN_VAR).ok().filter(|t| !t.trim().is_empty());

        let log_level = env::var("PDFCHAT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("PDFCHAT_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let request_timeout = Duration::from_secs(env_parse("PDFCHAT_REQUEST_TIMEOUT_SECS", 30));

        let poll_interval = env_millis("PDFCHAT_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL);
        let upload_reset_delay = env_millis("PDFCHAT_UPLOAD_RESET_MS", DEFAULT_UPLOAD_RESET_DELAY);
        let podcast_reset_delay =
            env_millis("PDFCHAT_PODCAST_RESET_MS", DEFAULT_PODCAST_RESET_DELAY);

        let max_poll_attempts = env::var("PDFCHAT_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0);

        let send_failure = env::var("PDFCHAT_SEND_FAILURE")
            .ok()
            .and_then(|v| SendFailurePolicy::from_str(&v))
            .unwrap_or_default();

        let stale_updates = env::var("PDFCHAT_STALE_UPDATES")
            .ok()
            .and_then(|v| StaleUpdatePolicy::from_str(&v))
            .unwrap_or_default();

        Self {
            api_base_url,
            api_token,
            log_level,
            log_format,
            request_timeout,
            poll_interval,
            upload_reset_delay,
            podcast_reset_delay,
            max_poll_attempts,
            send_failure,
            stale_updates,
        }
    }

    /// Timing and policy settings for the store.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            poll_interval: self.poll_interval,
            upload_reset_delay: self.upload_reset_delay,
            podcast_reset_delay: self.podcast_reset_delay,
            max_poll_attempts: self.max_poll_attempts,
            send_failure: self.send_failure,
            stale_updates: self.stale_updates,
        }
    }
}

fn env_parse(var: &str, default: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", var, v);
            default
        }),
        Err(_) => default,
    }
}

fn env_millis(var: &str, default: Duration) -> Duration {
    Duration::from_millis(env_parse(var, default.as_millis() as u64))
}
