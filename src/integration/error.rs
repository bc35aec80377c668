//! Integration error types
//!
//! Every failure is reported as one human-readable notice: the backend's
//! `detail` text, the transport error message, or a local precondition.

use std::fmt;

use serde_json::Value;

/// Errors raised by the handshake and pass-through operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    /// Network unreachable, timeout, undecodable body
    Transport(String),

    /// Non-success response from the backend
    Backend { status: u16, detail: String },

    /// Missing input caught before any network call
    Precondition(String),

    /// Backend answered the authorize call without a usable URL
    MissingAuthorizationUrl,

    /// Surface closed but the backend holds no credentials
    CredentialsPending,

    /// Backend reported the credential exchange as failed
    HandshakeFailed(String),

    /// Surface stayed open past the handshake timeout
    HandshakeTimeout { secs: u64 },

    /// Handshake was cancelled before the surface closed
    HandshakeCancelled,

    /// A handshake is already outstanding for this session
    AlreadyConnecting,

    /// Operation requires a connected session
    NotConnected,

    /// Operation not offered by this integration
    UnsupportedOperation(String),

    /// Secondary surface could not be opened
    SurfaceLaunch(String),
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationError::Transport(msg) => f.write_str(msg),
            IntegrationError::Backend { detail, .. } => f.write_str(detail),
            IntegrationError::Precondition(msg) => f.write_str(msg),
            IntegrationError::MissingAuthorizationUrl => {
                f.write_str("No authorization URL returned from server.")
            }
            IntegrationError::CredentialsPending => {
                f.write_str("Authorization was not completed; no credentials were stored.")
            }
            IntegrationError::HandshakeFailed(detail) => f.write_str(detail),
            IntegrationError::HandshakeTimeout { secs } => {
                write!(f, "Authorization window was not closed within {}s", secs)
            }
            IntegrationError::HandshakeCancelled => f.write_str("Authorization was cancelled"),
            IntegrationError::AlreadyConnecting => {
                f.write_str("An authorization is already in progress")
            }
            IntegrationError::NotConnected => {
                f.write_str("Not connected; run the authorization first")
            }
            IntegrationError::UnsupportedOperation(msg) => f.write_str(msg),
            IntegrationError::SurfaceLaunch(msg) => {
                write!(f, "Failed to open authorization window: {}", msg)
            }
        }
    }
}

impl std::error::Error for IntegrationError {}

impl From<reqwest::Error> for IntegrationError {
    fn from(e: reqwest::Error) -> Self {
        IntegrationError::Transport(e.to_string())
    }
}

impl IntegrationError {
    /// Error kind tag used by the console API
    pub fn kind(&self) -> &'static str {
        match self {
            IntegrationError::Transport(_) => "transport_error",
            IntegrationError::Backend { .. } => "backend_error",
            IntegrationError::Precondition(_) => "invalid_request",
            IntegrationError::MissingAuthorizationUrl => "backend_error",
            IntegrationError::CredentialsPending => "credentials_pending",
            IntegrationError::HandshakeFailed(_) => "handshake_failed",
            IntegrationError::HandshakeTimeout { .. } => "handshake_timeout",
            IntegrationError::HandshakeCancelled => "handshake_cancelled",
            IntegrationError::AlreadyConnecting => "conflict",
            IntegrationError::NotConnected => "not_connected",
            IntegrationError::UnsupportedOperation(_) => "invalid_request",
            IntegrationError::SurfaceLaunch(_) => "surface_error",
        }
    }
}

/// Extracts the human-readable `detail` from a backend error body
///
/// Handles FastAPI's string detail and its validation-error list, and falls
/// back to the raw body (or the status line when the body is empty).
pub fn extract_detail(status: u16, body: &str) -> String {
    let fallback = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("Request failed with status code {}", status)
        } else {
            trimmed.to_string()
        }
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };

    match json.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                fallback()
            } else {
                messages.join("; ")
            }
        }
        Some(Value::Null) | None => fallback(),
        Some(other) => other.to_string(),
    }
}
