//! Error types for the analysis client and the proxy endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Message used when an error renders to an empty string.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Errors returned by [`crate::client::AnalysisClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}", describe_transport(.0))]
    Transport(#[from] reqwest::Error),
    #[error("Server responded with {status}: {status_text}{}", detail(.message))]
    RemoteService {
        status: u16,
        status_text: String,
        /// `error` field of the response body, when it carried one.
        message: Option<String>,
    },
    #[error("Failed to parse analysis response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised by the proxy endpoints.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Missing or malformed request payload.
    #[error("{0}")]
    Validation(String),
    /// Upstream answered with a non-success status.
    #[error("Server responded with {status}: {status_text}")]
    RemoteService { status: u16, status_text: String },
    /// Upstream could not be reached or its body could not be read.
    #[error("{}", describe_transport(.0))]
    Transport(#[from] reqwest::Error),
    /// Upstream answered with a body that is not JSON.
    #[error("Failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProxyError {
    /// Status code returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::RemoteService { .. }
            | ProxyError::Transport(_)
            | ProxyError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({ "error": client_message(&self) });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Render an error for a client, falling back to [`UNKNOWN_ERROR`].
pub fn client_message(err: &dyn std::error::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}

/// Reason phrase for a status, empty for unregistered codes.
pub fn status_text(status: reqwest::StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

fn describe_transport(err: &reqwest::Error) -> String {
    let target = err
        .url()
        .map(|url| url.to_string())
        .unwrap_or_else(|| "server".to_string());

    if err.is_timeout() {
        format!("Request to {} timed out", target)
    } else if err.is_connect() {
        format!("Cannot connect to {}", target)
    } else if err.is_decode() {
        format!("Failed to decode response from {}: {}", target, err)
    } else {
        format!("Failed to send request: {}", err)
    }
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!(" ({})", message),
        _ => String::new(),
    }
}
