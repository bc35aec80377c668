//! Console API error mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::integration::IntegrationError;

use super::types::ConsoleErrorResponse;

/// Handler error, rendered as `{"error": {"type", "message"}}`
#[derive(Debug)]
pub struct ConsoleError(pub IntegrationError);

impl From<IntegrationError> for ConsoleError {
    fn from(e: IntegrationError) -> Self {
        Self(e)
    }
}

impl ConsoleError {
    /// Get corresponding HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            IntegrationError::Transport(_) => StatusCode::BAD_GATEWAY,
            IntegrationError::Backend { status, .. } if *status < 500 => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            IntegrationError::Backend { .. } => StatusCode::BAD_GATEWAY,
            IntegrationError::MissingAuthorizationUrl => StatusCode::BAD_GATEWAY,
            IntegrationError::Precondition(_) => StatusCode::BAD_REQUEST,
            IntegrationError::UnsupportedOperation(_) => StatusCode::BAD_REQUEST,
            IntegrationError::CredentialsPending => StatusCode::CONFLICT,
            IntegrationError::HandshakeFailed(_) => StatusCode::BAD_GATEWAY,
            IntegrationError::HandshakeTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            IntegrationError::HandshakeCancelled => StatusCode::CONFLICT,
            IntegrationError::AlreadyConnecting => StatusCode::CONFLICT,
            IntegrationError::NotConnected => StatusCode::CONFLICT,
            IntegrationError::SurfaceLaunch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ConsoleErrorResponse::new(self.0.kind(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
