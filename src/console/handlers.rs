//! Console API handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::integration::session::SessionSnapshot;
use crate::integration::types::{ContactFields, ContactOperation, SessionIdentity};

use super::error::ConsoleError;
use super::middleware::ConsoleState;
use super::types::{ActionResponse, ConnectResponse, ResultResponse, SetIdentityRequest};

/// GET /api/session
pub async fn get_session(State(state): State<ConsoleState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// PUT /api/session/identity
pub async fn set_identity(
    State(state): State<ConsoleState>,
    Json(payload): Json<SetIdentityRequest>,
) -> Result<Json<SessionSnapshot>, ConsoleError> {
    state.session.set_identity(SessionIdentity::new(
        payload.user_id,
        payload.org_id,
        payload.integration,
    ))?;
    Ok(Json(state.session.snapshot()))
}

/// POST /api/session/connect
///
/// Opens the surface and returns immediately; closure is awaited in the background.
pub async fn connect(
    State(state): State<ConsoleState>,
) -> Result<(StatusCode, Json<ConnectResponse>), ConsoleError> {
    let pending = state.handshake.start(&state.session).await?;
    let authorization_url = pending.authorization_url().to_string();
    let status = state.session.status();

    let handshake = state.handshake.clone();
    let session = state.session.clone();
    tokio::spawn(async move {
        if handshake.finish(&session, pending).await.is_ok() {
            tracing::info!("Console session connected");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ConnectResponse {
            status,
            authorization_url,
        }),
    ))
}

/// POST /api/session/surface/closed
pub async fn surface_closed(State(state): State<ConsoleState>) -> Json<ActionResponse> {
    if state.session.close_surface() {
        Json(ActionResponse::ok("Authorization window closed"))
    } else {
        Json(ActionResponse::noop("No authorization window is open"))
    }
}

/// POST /api/session/cancel
pub async fn cancel_handshake(State(state): State<ConsoleState>) -> Json<ActionResponse> {
    if state.session.cancel() {
        Json(ActionResponse::ok("Authorization cancelled"))
    } else {
        Json(ActionResponse::noop("No authorization in progress"))
    }
}

/// DELETE /api/session
pub async fn clear_session(State(state): State<ConsoleState>) -> Json<SessionSnapshot> {
    state.session.clear();
    tracing::info!("Console session cleared");
    Json(state.session.snapshot())
}

/// POST /api/data/load
pub async fn load_data(
    State(state): State<ConsoleState>,
) -> Result<Json<ResultResponse>, ConsoleError> {
    let result = state.passthrough.load(&state.session).await?;
    Ok(Json(ResultResponse {
        session: state.session.snapshot(),
        result,
    }))
}

/// POST /api/contacts/{operation}
pub async fn contact(
    State(state): State<ConsoleState>,
    Path(operation): Path<ContactOperation>,
    Json(fields): Json<ContactFields>,
) -> Result<Json<ResultResponse>, ConsoleError> {
    let result = state
        .passthrough
        .contact(&state.session, operation, &fields)
        .await?;
    Ok(Json(ResultResponse {
        session: state.session.snapshot(),
        result,
    }))
}
