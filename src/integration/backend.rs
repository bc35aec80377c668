//! Integrations backend client
//!
//! Thin client over the backend's form-encoded POST endpoints. Responses are
//! returned as raw JSON; no transformation, caching, or retry.

use reqwest::Client;
use serde_json::Value;

use crate::http_client::build_backend_client;
use crate::model::config::Config;

use super::error::{IntegrationError, extract_detail};
use super::types::{
    AuthorizationHandle, ContactFields, ContactOperation, CredentialBundle, CredentialStatus,
    IntegrationType, SessionIdentity,
};

/// Backend API client
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    origin: String,
}

impl BackendClient {
    pub fn new(client: Client, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = build_backend_client(config)?;
        Ok(Self::new(client, config.backend_origin()))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// POST form fields to `path` and return the response body as JSON
    ///
    /// A non-JSON success body is returned as a JSON string; an empty one as null.
    pub async fn invoke(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, IntegrationError> {
        let url = format!("{}{}", self.origin, path);
        tracing::debug!(%url, fields = form.len(), "Backend request");

        let response = self.client.post(&url).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = extract_detail(status.as_u16(), &body);
            tracing::warn!(%url, status = status.as_u16(), %detail, "Backend request failed");
            return Err(IntegrationError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(parse_body(&body))
    }

    /// Request a one-time authorization URL
    pub async fn authorize(
        &self,
        identity: &SessionIdentity,
    ) -> Result<AuthorizationHandle, IntegrationError> {
        let path = format!("/integrations/{}/authorize", identity.integration.slug());
        let body = self.invoke(&path, &identity_form(identity)).await?;

        body.as_str()
            .and_then(AuthorizationHandle::parse)
            .ok_or(IntegrationError::MissingAuthorizationUrl)
    }

    /// Retrieve the credentials exchanged by the backend
    ///
    /// Client errors (4xx) are the backend's way of saying the exchange did not
    /// produce credentials and come back as [`CredentialStatus::Failed`];
    /// transport failures and server errors are returned as `Err`.
    pub async fn fetch_credentials(
        &self,
        identity: &SessionIdentity,
    ) -> Result<CredentialStatus, IntegrationError> {
        let path = format!("/integrations/{}/credentials", identity.integration.slug());
        match self.invoke(&path, &identity_form(identity)).await {
            Ok(body) => Ok(interpret_credentials(body)),
            Err(IntegrationError::Backend { status, detail }) if (400..500).contains(&status) => {
                Ok(CredentialStatus::Failed(detail))
            }
            Err(e) => Err(e),
        }
    }

    /// Load integration items; `credentials` is forwarded as JSON text
    pub async fn load(
        &self,
        integration: IntegrationType,
        credentials: &Value,
    ) -> Result<Value, IntegrationError> {
        let path = format!("/integrations/{}/load", integration.slug());
        let credentials = credentials.to_string();
        self.invoke(&path, &[("credentials", credentials.as_str())])
            .await
    }

    /// HubSpot contact pass-through
    pub async fn contact(
        &self,
        operation: ContactOperation,
        user_id: &str,
        org_id: &str,
        fields: &ContactFields,
    ) -> Result<Value, IntegrationError> {
        let path = format!("/integrations/hubspot/contact/{}", operation.as_str());

        let mut form = vec![("user_id", user_id), ("org_id", org_id)];
        if let Some(contact_id) = fields.contact_id.as_deref() {
            form.push(("contact_id", contact_id));
        }
        if let Some(properties) = fields.properties_str.as_deref() {
            form.push(("properties_str", properties));
        }

        self.invoke(&path, &form).await
    }
}

fn identity_form(identity: &SessionIdentity) -> [(&str, &str); 2] {
    [
        ("user_id", identity.user_id.as_str()),
        ("org_id", identity.org_id.as_str()),
    ]
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Map a successful credential-retrieval body onto an explicit status
///
/// Accepts a status envelope (`{"status": "pending" | "succeeded" | "failed", ...}`)
/// and otherwise infers success from a non-empty object.
fn interpret_credentials(body: Value) -> CredentialStatus {
    let envelope_status = body
        .as_object()
        .filter(|obj| !obj.contains_key("access_token"))
        .and_then(|obj| obj.get("status"))
        .and_then(|s| s.as_str())
        .map(str::to_string);

    match envelope_status.as_deref() {
        Some("pending") => CredentialStatus::Pending,
        Some("failed") => {
            let detail = body
                .get("detail")
                .and_then(|d| d.as_str())
                .unwrap_or("Credential exchange failed")
                .to_string();
            CredentialStatus::Failed(detail)
        }
        Some("succeeded") => {
            let credentials = body.get("credentials").cloned().unwrap_or(Value::Null);
            match CredentialBundle::from_response(credentials) {
                Some(bundle) => CredentialStatus::Succeeded(bundle),
                None => CredentialStatus::Failed(
                    "Backend reported success without credentials".to_string(),
                ),
            }
        }
        _ => match CredentialBundle::from_response(body) {
            Some(bundle) => CredentialStatus::Succeeded(bundle),
            None => CredentialStatus::Pending,
        },
    }
}
