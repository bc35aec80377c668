//! Console session
//!
//! Owns the Session Identity and the connection state. Connection status is
//! derived from the state: `connected` exists only together with a Credential
//! Bundle, and at most one handshake attempt is outstanding at a time.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::IntegrationError;
use super::surface::SurfaceCloser;
use super::types::{ConnectionStatus, CredentialBundle, SessionIdentity};

enum SessionState {
    Disconnected,
    Connecting {
        attempt_id: Uuid,
        cancel: CancellationToken,
        started_at: DateTime<Utc>,
        authorization_url: Option<String>,
        closer: Option<SurfaceCloser>,
    },
    Connected {
        bundle: CredentialBundle,
        connected_at: DateTime<Utc>,
    },
}

struct SessionInner {
    identity: SessionIdentity,
    state: SessionState,
    /// Notice of the most recent failed attempt
    last_error: Option<String>,
}

/// Ticket for one handshake attempt, issued by [`ConsoleSession::begin_attempt`]
#[derive(Debug, Clone)]
pub struct HandshakeAttempt {
    pub id: Uuid,
    pub identity: SessionIdentity,
    pub cancel: CancellationToken,
}

/// Serializable view of the session for status displays
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user_id: String,
    pub org_id: String,
    pub integration: String,
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub struct ConsoleSession {
    inner: Mutex<SessionInner>,
}

impl ConsoleSession {
    pub fn new(identity: SessionIdentity) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                identity,
                state: SessionState::Disconnected,
                last_error: None,
            }),
        }
    }

    pub fn identity(&self) -> SessionIdentity {
        self.inner.lock().identity.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.inner.lock().state {
            SessionState::Disconnected => ConnectionStatus::Disconnected,
            SessionState::Connecting { .. } => ConnectionStatus::Connecting,
            SessionState::Connected { .. } => ConnectionStatus::Connected,
        }
    }

    /// Identity and credentials of a connected session
    pub fn connected(&self) -> Result<(SessionIdentity, CredentialBundle), IntegrationError> {
        let inner = self.inner.lock();
        match &inner.state {
            SessionState::Connected { bundle, .. } => Ok((inner.identity.clone(), bundle.clone())),
            _ => Err(IntegrationError::NotConnected),
        }
    }

    /// Replace the identity
    ///
    /// Rejected while connecting. Credentials held for a different identity are dropped.
    pub fn set_identity(&self, identity: SessionIdentity) -> Result<(), IntegrationError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.state {
            SessionState::Connecting { .. } => return Err(IntegrationError::AlreadyConnecting),
            SessionState::Connected { .. } if inner.identity != identity => {
                tracing::info!("Identity changed, dropping stored credentials");
                inner.state = SessionState::Disconnected;
            }
            _ => {}
        }
        inner.identity = identity;
        Ok(())
    }

    /// Enter `connecting` for the current identity
    pub fn begin_attempt(&self) -> Result<HandshakeAttempt, IntegrationError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(field) = inner.identity.missing_field() {
            return Err(IntegrationError::Precondition(format!("{} missing!", field)));
        }
        match inner.state {
            SessionState::Connecting { .. } => return Err(IntegrationError::AlreadyConnecting),
            SessionState::Connected { .. } => {
                return Err(IntegrationError::Precondition(
                    "Already connected; clear fields to reconnect".to_string(),
                ));
            }
            SessionState::Disconnected => {}
        }

        let attempt = HandshakeAttempt {
            id: Uuid::new_v4(),
            identity: inner.identity.clone(),
            cancel: CancellationToken::new(),
        };
        inner.state = SessionState::Connecting {
            attempt_id: attempt.id,
            cancel: attempt.cancel.clone(),
            started_at: Utc::now(),
            authorization_url: None,
            closer: None,
        };
        inner.last_error = None;
        tracing::debug!(attempt = %attempt.id, "Handshake attempt started");
        Ok(attempt)
    }

    /// Remember the opened surface of the current attempt
    pub fn attach_surface(&self, attempt_id: Uuid, url: &str, surface_closer: SurfaceCloser) {
        let mut inner = self.inner.lock();
        if let SessionState::Connecting {
            attempt_id: current,
            authorization_url,
            closer,
            ..
        } = &mut inner.state
        {
            if *current == attempt_id {
                *authorization_url = Some(url.to_string());
                *closer = Some(surface_closer);
            }
        }
    }

    /// Signal that the open surface was closed; false if none is open
    pub fn close_surface(&self) -> bool {
        let inner = self.inner.lock();
        match &inner.state {
            SessionState::Connecting {
                closer: Some(closer),
                ..
            } => {
                closer.close();
                true
            }
            _ => false,
        }
    }

    /// Cancel the outstanding attempt; false if none is outstanding
    ///
    /// An attempt with no surface attached yet has nobody waiting on its token
    /// once its request is dropped, so it reverts to `disconnected` right away.
    pub fn cancel(&self) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let unattached = match &inner.state {
            SessionState::Connecting { cancel, closer, .. } => {
                cancel.cancel();
                closer.is_none()
            }
            _ => return false,
        };
        if unattached {
            inner.state = SessionState::Disconnected;
            inner.last_error = Some(IntegrationError::HandshakeCancelled.to_string());
        }
        true
    }

    /// Publish credentials for `attempt_id`; stale attempts are ignored
    pub fn complete(&self, attempt_id: Uuid, bundle: CredentialBundle) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.state {
            SessionState::Connecting { attempt_id: current, .. } if current == attempt_id => {
                let fingerprint = bundle.fingerprint().unwrap_or_else(|| "-".to_string());
                tracing::info!(fingerprint = %fingerprint, "Credentials stored, session connected");
                inner.state = SessionState::Connected {
                    bundle,
                    connected_at: Utc::now(),
                };
                inner.last_error = None;
                true
            }
            _ => {
                tracing::debug!(attempt = %attempt_id, "Ignoring credentials for stale attempt");
                false
            }
        }
    }

    /// Revert `attempt_id` to `disconnected`, keeping `error` as the notice
    /// shown in the session view; stale attempts are ignored
    pub fn abort(&self, attempt_id: Uuid, error: &IntegrationError) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.state {
            SessionState::Connecting { attempt_id: current, .. } if current == attempt_id => {
                inner.state = SessionState::Disconnected;
                inner.last_error = Some(error.to_string());
                true
            }
            _ => false,
        }
    }

    /// Clear fields: drop credentials and cancel any outstanding attempt
    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let SessionState::Connecting { cancel, .. } = &inner.state {
            cancel.cancel();
        }
        inner.state = SessionState::Disconnected;
        inner.last_error = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        let mut snapshot = SessionSnapshot {
            user_id: inner.identity.user_id.clone(),
            org_id: inner.identity.org_id.clone(),
            integration: inner.identity.integration.to_string(),
            status: ConnectionStatus::Disconnected,
            authorization_url: None,
            credential_fingerprint: None,
            started_at: None,
            connected_at: None,
            last_error: inner.last_error.clone(),
        };

        match &inner.state {
            SessionState::Disconnected => {}
            SessionState::Connecting {
                started_at,
                authorization_url,
                ..
            } => {
                snapshot.status = ConnectionStatus::Connecting;
                snapshot.authorization_url = authorization_url.clone();
                snapshot.started_at = Some(started_at.to_rfc3339());
            }
            SessionState::Connected {
                bundle,
                connected_at,
            } => {
                snapshot.status = ConnectionStatus::Connected;
                snapshot.credential_fingerprint = bundle.fingerprint();
                snapshot.connected_at = Some(connected_at.to_rfc3339());
            }
        }

        snapshot
    }
}
