//! Data-load and contact pass-through
//!
//! Presence checks run before any network call; the backend's JSON comes back untouched.

use serde_json::{Value, json};

use crate::model::config::LoadPayload;

use super::backend::BackendClient;
use super::error::IntegrationError;
use super::session::ConsoleSession;
use super::types::{ContactFields, ContactOperation, CredentialBundle, SessionIdentity};

#[derive(Clone)]
pub struct PassThrough {
    backend: BackendClient,
    load_payload: LoadPayload,
}

impl PassThrough {
    pub fn new(backend: BackendClient, load_payload: LoadPayload) -> Self {
        Self {
            backend,
            load_payload,
        }
    }

    /// Load integration data for a connected session
    pub async fn load(&self, session: &ConsoleSession) -> Result<Value, IntegrationError> {
        require_identity(&session.identity())?;
        let (identity, bundle) = session.connected()?;
        let (user_id, org_id) = effective_owner(&identity, &bundle)?;

        let credentials = match self.load_payload {
            LoadPayload::Minimal => json!({ "user_id": user_id, "org_id": org_id }),
            LoadPayload::Full => {
                let mut full = bundle.as_value();
                if let Some(fields) = full.as_object_mut() {
                    fields.entry("user_id").or_insert_with(|| json!(user_id));
                    fields.entry("org_id").or_insert_with(|| json!(org_id));
                }
                full
            }
        };

        tracing::info!(integration = %identity.integration, "Loading integration data");
        self.backend.load(identity.integration, &credentials).await
    }

    /// Run a HubSpot contact operation for a connected session
    pub async fn contact(
        &self,
        session: &ConsoleSession,
        operation: ContactOperation,
        fields: &ContactFields,
    ) -> Result<Value, IntegrationError> {
        require_identity(&session.identity())?;
        let (identity, bundle) = session.connected()?;

        if !identity.integration.supports_contacts() {
            return Err(IntegrationError::UnsupportedOperation(format!(
                "Contact operations are not available for {}",
                identity.integration
            )));
        }

        let fields = normalize(fields);
        if operation.needs_contact_id() && fields.contact_id.is_none() {
            return Err(IntegrationError::Precondition(format!(
                "contact_id is required to {} a contact",
                operation.as_str()
            )));
        }
        if operation.needs_properties() && fields.properties_str.is_none() {
            return Err(IntegrationError::Precondition(format!(
                "properties are required to {} a contact",
                operation.as_str()
            )));
        }

        let (user_id, org_id) = effective_owner(&identity, &bundle)?;
        tracing::info!(operation = operation.as_str(), "HubSpot contact request");
        self.backend
            .contact(operation, &user_id, &org_id, &fields)
            .await
    }
}

fn require_identity(identity: &SessionIdentity) -> Result<(), IntegrationError> {
    match identity.missing_field() {
        Some(_) => Err(IntegrationError::Precondition(
            "user_id or org_id missing!".to_string(),
        )),
        None => Ok(()),
    }
}

/// Owner ids from the bundle, falling back to the session identity
fn effective_owner(
    identity: &SessionIdentity,
    bundle: &CredentialBundle,
) -> Result<(String, String), IntegrationError> {
    let pick = |from_bundle: Option<&str>, fallback: &str| {
        from_bundle
            .map(str::to_string)
            .or_else(|| Some(fallback.trim().to_string()).filter(|s| !s.is_empty()))
    };

    match (
        pick(bundle.user_id(), &identity.user_id),
        pick(bundle.org_id(), &identity.org_id),
    ) {
        (Some(user_id), Some(org_id)) => Ok((user_id, org_id)),
        _ => Err(IntegrationError::Precondition(
            "user_id or org_id missing!".to_string(),
        )),
    }
}

/// Blank form fields count as absent
fn normalize(fields: &ContactFields) -> ContactFields {
    let keep = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
    ContactFields {
        contact_id: keep(&fields.contact_id),
        properties_str: keep(&fields.properties_str),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::fake_backend::FakeBackend;
    use crate::integration::types::IntegrationType;

    const CREATE: &str = "/integrations/hubspot/contact/create";

    fn connected_session(identity: SessionIdentity, bundle: Value) -> ConsoleSession {
        let session = ConsoleSession::new(identity);
        let attempt = session.begin_attempt().unwrap();
        session.complete(attempt.id, CredentialBundle::from_response(bundle).unwrap());
        session
    }

    fn hubspot_session() -> ConsoleSession {
        connected_session(
            SessionIdentity::new("TestUser", "TestOrg", IntegrationType::Hubspot),
            json!({"access_token": "tok123", "user_id": "TestUser", "org_id": "TestOrg"}),
        )
    }

    #[tokio::test]
    async fn test_load_sends_minimal_payload() {
        let fake = FakeBackend::new();
        fake.respond("/integrations/hubspot/load", 200, json!([{"id": "42", "name": "Ada"}]));
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Minimal);

        let result = passthrough.load(&hubspot_session()).await.unwrap();
        assert_eq!(result, json!([{"id": "42", "name": "Ada"}]));

        let calls = fake.calls();
        let sent: Value = serde_json::from_str(calls[0].field("credentials").unwrap()).unwrap();
        assert_eq!(sent, json!({"user_id": "TestUser", "org_id": "TestOrg"}));
    }

    #[tokio::test]
    async fn test_load_full_payload_keeps_tokens() {
        let fake = FakeBackend::new();
        fake.respond("/integrations/notion/load", 200, json!([]));
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Full);
        let session = connected_session(
            SessionIdentity::new("TestUser", "TestOrg", IntegrationType::Notion),
            json!({"access_token": "tok123"}),
        );

        passthrough.load(&session).await.unwrap();

        let calls = fake.calls();
        let sent: Value = serde_json::from_str(calls[0].field("credentials").unwrap()).unwrap();
        assert_eq!(sent["access_token"], "tok123");
        assert_eq!(sent["user_id"], "TestUser");
        assert_eq!(sent["org_id"], "TestOrg");
    }

    #[tokio::test]
    async fn test_load_without_identity_makes_no_call() {
        let fake = FakeBackend::new();
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Minimal);

        for (user, org) in [("", "TestOrg"), ("TestUser", ""), ("", "")] {
            let session =
                ConsoleSession::new(SessionIdentity::new(user, org, IntegrationType::Airtable));
            let err = passthrough.load(&session).await.unwrap_err();
            assert_eq!(
                err,
                IntegrationError::Precondition("user_id or org_id missing!".to_string())
            );
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_load_requires_connection() {
        let fake = FakeBackend::new();
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Minimal);
        let session = ConsoleSession::new(SessionIdentity::new(
            "TestUser",
            "TestOrg",
            IntegrationType::Notion,
        ));

        let err = passthrough.load(&session).await.unwrap_err();
        assert_eq!(err, IntegrationError::NotConnected);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_contact_end_to_end() {
        let fake = FakeBackend::new();
        let backend_response = json!({
            "id": "101",
            "properties": {"email": "a@b.com"},
            "createdAt": "2026-10-16T09:00:00Z"
        });
        fake.respond(CREATE, 200, backend_response.clone());
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Minimal);

        let fields = ContactFields {
            contact_id: None,
            properties_str: Some(r#"{"email":"a@b.com"}"#.to_string()),
        };
        let result = passthrough
            .contact(&hubspot_session(), ContactOperation::Create, &fields)
            .await
            .unwrap();
        assert_eq!(result, backend_response);

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, CREATE);
        assert_eq!(calls[0].field("user_id"), Some("TestUser"));
        assert_eq!(calls[0].field("org_id"), Some("TestOrg"));
        assert_eq!(calls[0].field("properties_str"), Some(r#"{"email":"a@b.com"}"#));
        assert!(calls[0].field("contact_id").is_none());
    }

    #[tokio::test]
    async fn test_contact_presence_checks() {
        let fake = FakeBackend::new();
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Minimal);
        let session = hubspot_session();

        let blank = ContactFields {
            contact_id: Some("  ".to_string()),
            properties_str: None,
        };
        for operation in [
            ContactOperation::Get,
            ContactOperation::Create,
            ContactOperation::Update,
            ContactOperation::Delete,
        ] {
            let err = passthrough.contact(&session, operation, &blank).await.unwrap_err();
            assert!(matches!(err, IntegrationError::Precondition(_)));
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_contacts_only_for_hubspot() {
        let fake = FakeBackend::new();
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Minimal);
        let session = connected_session(
            SessionIdentity::new("TestUser", "TestOrg", IntegrationType::Notion),
            json!({"access_token": "tok123"}),
        );
        let fields = ContactFields {
            contact_id: Some("101".to_string()),
            properties_str: None,
        };

        let err = passthrough
            .contact(&session, ContactOperation::Get, &fields)
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::UnsupportedOperation(_)));
    }

    #[tokio::test]
    async fn test_contact_backend_error_detail() {
        let fake = FakeBackend::new();
        fake.respond(
            "/integrations/hubspot/contact/delete",
            400,
            json!({"detail": "Contact 999 not found"}),
        );
        let passthrough = PassThrough::new(fake.client().await, LoadPayload::Minimal);
        let fields = ContactFields {
            contact_id: Some("999".to_string()),
            properties_str: None,
        };

        let err = passthrough
            .contact(&hubspot_session(), ContactOperation::Delete, &fields)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Contact 999 not found");
    }
}
