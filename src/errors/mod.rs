//! Error handling module for the PDF chat client.
//!
//! Every failure talking to the backend is an [`ApiError`]. Action handlers
//! treat all variants as one "request failed" category; the variants exist
//! for logging and for callers of [`crate::api::HttpApi`] that want detail.

use std::fmt;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const HTTP_STATUS: &str = "HTTP_STATUS";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const INVALID_UPLOAD: &str = "INVALID_UPLOAD";
    pub const INVALID_URL: &str = "INVALID_URL";
}

/// Client error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No bearer credential available
    Unauthenticated(String),
    /// Connection, timeout or transport failure
    Network(String),
    /// Server answered with a non-success status
    Status { status: u16, message: String },
    /// Response body did not match the expected shape
    Decode(String),
    /// Local file access failed
    Io(String),
    /// Upload payload rejected before sending
    InvalidUpload(String),
    /// Base URL cannot carry path segments
    InvalidUrl(String),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => codes::UNAUTHENTICATED,
            ApiError::Network(_) => codes::NETWORK_ERROR,
            ApiError::Status { .. } => codes::HTTP_STATUS,
            ApiError::Decode(_) => codes::DECODE_ERROR,
            ApiError::Io(_) => codes::IO_ERROR,
            ApiError::InvalidUpload(_) => codes::INVALID_UPLOAD,
            ApiError::InvalidUrl(_) => codes::INVALID_URL,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(msg) => msg.clone(),
            ApiError::Network(msg) => msg.clone(),
            ApiError::Status { status, message } if message.is_empty() => {
                format!("HTTP {}", status)
            }
            ApiError::Status { status, message } => format!("HTTP {}: {}", status, message),
            ApiError::Decode(msg) => msg.clone(),
            ApiError::Io(msg) => msg.clone(),
            ApiError::InvalidUpload(msg) => msg.clone(),
            ApiError::InvalidUrl(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Decode(format!("Invalid response body: {}", err))
        } else {
            ApiError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        ApiError::Decode(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        ApiError::Io(format!("I/O error: {}", err))
    }
}
