//! Console API routing configuration

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::{
    handlers::{
        cancel_handshake, clear_session, connect, contact, get_session, load_data, set_identity,
        surface_closed,
    },
    middleware::{ConsoleState, console_auth_middleware},
};

/// Create Console API router
///
/// # Endpoints
/// - `GET /session` - Session status
/// - `DELETE /session` - Clear fields (drop credentials)
/// - `PUT /session/identity` - Set user, organization, integration type
/// - `POST /session/connect` - Start the OAuth handshake
/// - `POST /session/surface/closed` - Report the authorization window closed
/// - `POST /session/cancel` - Cancel the pending handshake
/// - `POST /data/load` - Load integration data
/// - `POST /contacts/{operation}` - HubSpot contact get/create/update/delete
///
/// # Authentication
/// When an admin API key is configured, requires either:
/// - `x-api-key` header
/// - `Authorization: Bearer <token>` header
pub fn create_console_router(state: ConsoleState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/session", get(get_session).delete(clear_session))
        .route("/session/identity", put(set_identity))
        .route("/session/connect", post(connect))
        .route("/session/surface/closed", post(surface_closed))
        .route("/session/cancel", post(cancel_handshake))
        .route("/data/load", post(load_data))
        .route("/contacts/{operation}", post(contact))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            console_auth_middleware,
        ))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
