//! Console API shared state and authentication middleware

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::common::auth::{constant_time_eq, extract_api_key};
use crate::integration::{ConsoleSession, Handshake, PassThrough};

use super::types::ConsoleErrorResponse;

/// Console API shared state
#[derive(Clone)]
pub struct ConsoleState {
    pub session: Arc<ConsoleSession>,
    pub handshake: Handshake,
    pub passthrough: PassThrough,
    /// Required API key; `None` leaves the API open
    pub api_key: Option<Arc<str>>,
}

impl ConsoleState {
    pub fn new(
        session: Arc<ConsoleSession>,
        handshake: Handshake,
        passthrough: PassThrough,
        api_key: Option<&str>,
    ) -> Self {
        Self {
            session,
            handshake,
            passthrough,
            api_key: api_key.map(Arc::from),
        }
    }
}

/// Console API authentication middleware
pub async fn console_auth_middleware(
    State(state): State<ConsoleState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    match extract_api_key(&request) {
        Some(key) if constant_time_eq(&key, expected) => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected console request without valid API key");
            let error = ConsoleErrorResponse::authentication_error();
            (StatusCode::UNAUTHORIZED, Json(error)).into_response()
        }
    }
}
