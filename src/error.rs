use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for openproxy
#[derive(Error, Debug)]
pub enum OpenProxyError {
    // Source errors
    #[error("Source {url} failed: {message}")]
    SourceFetch { url: String, message: String },

    #[error("Invalid proxy endpoint: {0}")]
    InvalidEndpoint(String),

    // Registry errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Stream errors
    #[error("No proxies were collected from any source")]
    EmptyResult,

    #[error("Proxy stream is closed")]
    StreamClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for openproxy operations
pub type Result<T> = std::result::Result<T, OpenProxyError>;

impl OpenProxyError {
    /// Build a `SourceFetch` error for the given source
    pub fn source_fetch(url: impl Into<String>, message: impl ToString) -> Self {
        OpenProxyError::SourceFetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            OpenProxyError::InvalidRequest(_)
            | OpenProxyError::InvalidEndpoint(_)
            | OpenProxyError::InvalidConfig(_)
            | OpenProxyError::Configuration(_) => StatusCode::BAD_REQUEST,

            // 502 Bad Gateway
            OpenProxyError::SourceFetch { .. } | OpenProxyError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }

            // 503 Service Unavailable
            OpenProxyError::EmptyResult | OpenProxyError::StreamClosed => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            OpenProxyError::Io(_) | OpenProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for OpenProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

// Convert from URL parse errors
impl From<url::ParseError> for OpenProxyError {
    fn from(err: url::ParseError) -> Self {
        OpenProxyError::InvalidEndpoint(err.to_string())
    }
}
