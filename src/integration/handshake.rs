//! OAuth handshake
//!
//! authorize → open surface → wait for closure → retrieve credentials once.
//! Every failure returns the session to `disconnected`.

use std::sync::Arc;

use uuid::Uuid;

use super::backend::BackendClient;
use super::error::IntegrationError;
use super::poller::CompletionPoller;
use super::session::{ConsoleSession, HandshakeAttempt};
use super::surface::{SurfaceHandle, SurfaceLauncher};
use super::types::{CredentialBundle, CredentialStatus};

/// A handshake whose surface is open and not yet observed closed
#[derive(Debug)]
pub struct PendingHandshake {
    pub attempt: HandshakeAttempt,
    pub surface: SurfaceHandle,
}

impl PendingHandshake {
    pub fn authorization_url(&self) -> &str {
        self.surface.url()
    }
}

#[derive(Clone)]
pub struct Handshake {
    backend: BackendClient,
    launcher: Arc<dyn SurfaceLauncher>,
    poller: CompletionPoller,
}

impl Handshake {
    pub fn new(
        backend: BackendClient,
        launcher: Arc<dyn SurfaceLauncher>,
        poller: CompletionPoller,
    ) -> Self {
        Self {
            backend,
            launcher,
            poller,
        }
    }

    /// Request an authorization URL and open exactly one surface on it
    ///
    /// Nothing is opened if the attempt was cancelled or cleared while the
    /// authorization request was in flight.
    pub async fn begin(&self, attempt: &HandshakeAttempt) -> Result<SurfaceHandle, IntegrationError> {
        let identity = &attempt.identity;
        if let Some(field) = identity.missing_field() {
            return Err(IntegrationError::Precondition(format!("{} missing!", field)));
        }

        let handle = self.backend.authorize(identity).await?;
        if attempt.cancel.is_cancelled() {
            tracing::info!(attempt = %attempt.id, "Attempt cancelled before the window opened");
            return Err(IntegrationError::HandshakeCancelled);
        }
        tracing::debug!(url = handle.url(), "Opening authorization window");
        tracing::info!(
            integration = %identity.integration,
            user = %identity.user_id,
            org = %identity.org_id,
            "Authorization URL issued"
        );
        self.launcher.launch(handle.into_url())
    }

    /// Wait for `surface` to close, then retrieve credentials exactly once
    pub async fn await_credentials(
        &self,
        attempt: &HandshakeAttempt,
        surface: &SurfaceHandle,
    ) -> Result<CredentialBundle, IntegrationError> {
        self.poller.await_closure(surface, &attempt.cancel).await?;

        match self.backend.fetch_credentials(&attempt.identity).await? {
            CredentialStatus::Succeeded(bundle) => Ok(bundle),
            CredentialStatus::Pending => Err(IntegrationError::CredentialsPending),
            CredentialStatus::Failed(detail) => Err(IntegrationError::HandshakeFailed(detail)),
        }
    }

    /// Enter `connecting` and open the surface
    ///
    /// If this future is dropped before the surface opens, the attempt is
    /// aborted so the session does not stay `connecting`.
    pub async fn start(&self, session: &ConsoleSession) -> Result<PendingHandshake, IntegrationError> {
        let attempt = session.begin_attempt()?;
        let mut guard = AttemptGuard {
            session,
            attempt_id: attempt.id,
            armed: true,
        };

        let outcome = self.begin(&attempt).await;
        guard.armed = false;

        match outcome {
            Ok(surface) => {
                session.attach_surface(attempt.id, surface.url(), surface.closer());
                Ok(PendingHandshake { attempt, surface })
            }
            Err(e) => {
                session.abort(attempt.id, &e);
                Err(e)
            }
        }
    }

    /// Observe closure and publish the outcome to the session
    pub async fn finish(
        &self,
        session: &ConsoleSession,
        pending: PendingHandshake,
    ) -> Result<CredentialBundle, IntegrationError> {
        let PendingHandshake { attempt, surface } = pending;

        match self.await_credentials(&attempt, &surface).await {
            Ok(bundle) => {
                if session.complete(attempt.id, bundle.clone()) {
                    Ok(bundle)
                } else {
                    // Cleared or superseded while the surface was open
                    Err(IntegrationError::HandshakeCancelled)
                }
            }
            Err(e) => {
                session.abort(attempt.id, &e);
                tracing::warn!(attempt = %attempt.id, error = %e, "Handshake did not complete");
                Err(e)
            }
        }
    }

    /// Run the full handshake
    pub async fn connect(&self, session: &ConsoleSession) -> Result<CredentialBundle, IntegrationError> {
        let pending = self.start(session).await?;
        self.finish(session, pending).await
    }

    /// Adopt credentials the backend already holds, without opening a surface
    pub async fn restore(&self, session: &ConsoleSession) -> Result<CredentialBundle, IntegrationError> {
        let attempt = session.begin_attempt()?;

        let outcome = match self.backend.fetch_credentials(&attempt.identity).await {
            Ok(CredentialStatus::Succeeded(bundle)) => Ok(bundle),
            Ok(CredentialStatus::Pending) => Err(IntegrationError::NotConnected),
            Ok(CredentialStatus::Failed(detail)) => Err(IntegrationError::HandshakeFailed(detail)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(bundle) => {
                session.complete(attempt.id, bundle.clone());
                Ok(bundle)
            }
            Err(e) => {
                session.abort(attempt.id, &e);
                Err(e)
            }
        }
    }
}

/// Aborts an attempt whose `start` future was dropped mid-request
struct AttemptGuard<'a> {
    session: &'a ConsoleSession,
    attempt_id: Uuid,
    armed: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && self
                .session
                .abort(self.attempt_id, &IntegrationError::HandshakeCancelled)
        {
            tracing::warn!(attempt = %self.attempt_id, "Authorization request dropped, attempt aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::fake_backend::FakeBackend;
    use crate::integration::surface::testing::RecordingLauncher;
    use crate::integration::types::{ConnectionStatus, IntegrationType, SessionIdentity};
    use serde_json::json;
    use std::time::Duration;

    const AUTHORIZE: &str = "/integrations/hubspot/authorize";
    const CREDENTIALS: &str = "/integrations/hubspot/credentials";

    fn session() -> ConsoleSession {
        ConsoleSession::new(SessionIdentity::new(
            "TestUser",
            "TestOrg",
            IntegrationType::Hubspot,
        ))
    }

    async fn handshake(fake: &FakeBackend, launcher: Arc<RecordingLauncher>) -> Handshake {
        let poller = CompletionPoller::new(Duration::from_millis(5), Duration::from_secs(5));
        Handshake::new(fake.client().await, launcher, poller)
    }

    #[tokio::test]
    async fn test_end_to_end_hubspot_connect() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        fake.respond(
            CREDENTIALS,
            200,
            json!({"access_token": "tok123", "user_id": "TestUser", "org_id": "TestOrg"}),
        );
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher.clone()).await;
        let session = session();

        let pending = handshake.start(&session).await.unwrap();
        assert_eq!(session.status(), ConnectionStatus::Connecting);
        assert_eq!(launcher.urls(), vec!["https://hubspot.example/oauth?state=abc".to_string()]);

        // Let several polling ticks pass before the window closes
        let closer = pending.surface.closer();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            closer.close();
        });

        let bundle = handshake.finish(&session, pending).await.unwrap();
        assert_eq!(bundle.user_id(), Some("TestUser"));
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(fake.calls_to(CREDENTIALS), 1);
    }

    #[tokio::test]
    async fn test_empty_credentials_revert_to_disconnected() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        fake.respond(CREDENTIALS, 200, json!({}));
        let launcher = Arc::new(RecordingLauncher::closing_immediately());
        let handshake = handshake(&fake, launcher).await;
        let session = session();

        let err = handshake.connect(&session).await.unwrap_err();
        assert_eq!(err, IntegrationError::CredentialsPending);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert!(session.connected().is_err());
        assert_eq!(fake.calls_to(CREDENTIALS), 1);
    }

    #[tokio::test]
    async fn test_backend_rejection_surfaces_detail() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        fake.respond(CREDENTIALS, 400, json!({"detail": "No HubSpot credentials found."}));
        let launcher = Arc::new(RecordingLauncher::closing_immediately());
        let handshake = handshake(&fake, launcher).await;
        let session = session();

        let err = handshake.connect(&session).await.unwrap_err();
        assert_eq!(err.to_string(), "No HubSpot credentials found.");
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_missing_url_opens_nothing() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!(null));
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher.clone()).await;
        let session = session();

        let err = handshake.connect(&session).await.unwrap_err();
        assert_eq!(err, IntegrationError::MissingAuthorizationUrl);
        assert_eq!(launcher.launch_count(), 0);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(fake.calls_to(CREDENTIALS), 0);
    }

    #[tokio::test]
    async fn test_cancel_skips_credential_retrieval() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher).await;
        let session = session();

        let pending = handshake.start(&session).await.unwrap();
        assert!(session.cancel());

        let err = handshake.finish(&session, pending).await.unwrap_err();
        assert_eq!(err, IntegrationError::HandshakeCancelled);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(fake.calls_to(CREDENTIALS), 0);
    }

    #[tokio::test]
    async fn test_timeout_reverts_to_disconnected() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        let launcher = Arc::new(RecordingLauncher::default());
        let poller = CompletionPoller::new(Duration::from_millis(5), Duration::from_millis(30));
        let handshake = Handshake::new(fake.client().await, launcher, poller);
        let session = session();

        let err = handshake.connect(&session).await.unwrap_err();
        assert!(matches!(err, IntegrationError::HandshakeTimeout { .. }));
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(fake.calls_to(CREDENTIALS), 0);
    }

    #[tokio::test]
    async fn test_second_connect_rejected_without_network_call() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher.clone()).await;
        let session = session();

        let _pending = handshake.start(&session).await.unwrap();
        let err = handshake.start(&session).await.unwrap_err();
        assert_eq!(err, IntegrationError::AlreadyConnecting);
        assert_eq!(fake.calls_to(AUTHORIZE), 1);
        assert_eq!(launcher.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_close_via_session_completes_handshake() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        fake.respond(CREDENTIALS, 200, json!({"access_token": "tok123"}));
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher).await;
        let session = Arc::new(session());

        let pending = handshake.start(&session).await.unwrap();
        let task = {
            let handshake = handshake.clone();
            let session = session.clone();
            tokio::spawn(async move { handshake.finish(&session, pending).await })
        };

        assert!(session.close_surface());
        assert!(task.await.unwrap().is_ok());
        assert_eq!(session.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_dropped_start_reverts_to_disconnected() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = crate::http_client::build_backend_client(&crate::model::config::Config::default())
            .unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let poller = CompletionPoller::new(Duration::from_millis(5), Duration::from_secs(5));
        let handshake = Handshake::new(BackendClient::new(client, origin), launcher.clone(), poller);
        let session = session();

        let dropped = tokio::time::timeout(Duration::from_millis(100), handshake.start(&session)).await;
        assert!(dropped.is_err());
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(launcher.launch_count(), 0);
        assert!(session.begin_attempt().is_ok());
    }

    #[tokio::test]
    async fn test_cleared_attempt_opens_no_window() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher.clone()).await;
        let session = session();

        let attempt = session.begin_attempt().unwrap();
        session.clear();

        let err = handshake.begin(&attempt).await.unwrap_err();
        assert_eq!(err, IntegrationError::HandshakeCancelled);
        assert_eq!(launcher.launch_count(), 0);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_failure_notice_recorded_on_session() {
        let fake = FakeBackend::new();
        fake.respond(AUTHORIZE, 200, json!("https://hubspot.example/oauth?state=abc"));
        fake.respond(CREDENTIALS, 400, json!({"detail": "No HubSpot credentials found."}));
        let launcher = Arc::new(RecordingLauncher::closing_immediately());
        let handshake = handshake(&fake, launcher).await;
        let session = session();

        handshake.connect(&session).await.unwrap_err();
        assert_eq!(
            session.snapshot().last_error.as_deref(),
            Some("No HubSpot credentials found.")
        );
    }

    #[tokio::test]
    async fn test_restore_adopts_stored_credentials() {
        let fake = FakeBackend::new();
        fake.respond(CREDENTIALS, 200, json!({"access_token": "tok123"}));
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher.clone()).await;
        let session = session();

        handshake.restore(&session).await.unwrap();
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(launcher.launch_count(), 0);
        assert_eq!(fake.calls_to(AUTHORIZE), 0);
    }

    #[tokio::test]
    async fn test_restore_without_credentials_is_not_connected() {
        let fake = FakeBackend::new();
        fake.respond(CREDENTIALS, 200, json!(null));
        let launcher = Arc::new(RecordingLauncher::default());
        let handshake = handshake(&fake, launcher).await;
        let session = session();

        let err = handshake.restore(&session).await.unwrap_err();
        assert_eq!(err, IntegrationError::NotConnected);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }
}
