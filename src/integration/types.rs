//! Integration domain types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Third-party integrations exposed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrationType {
    Notion,
    Airtable,
    Hubspot,
}

impl IntegrationType {
    /// Path segment used by the backend routes
    pub fn slug(&self) -> &'static str {
        match self {
            IntegrationType::Notion => "notion",
            IntegrationType::Airtable => "airtable",
            IntegrationType::Hubspot => "hubspot",
        }
    }

    pub fn supports_contacts(&self) -> bool {
        matches!(self, IntegrationType::Hubspot)
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegrationType::Notion => "Notion",
            IntegrationType::Airtable => "Airtable",
            IntegrationType::Hubspot => "Hubspot",
        };
        f.write_str(name)
    }
}

/// Who is connecting, and to what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: String,
    pub org_id: String,
    pub integration: IntegrationType,
}

impl SessionIdentity {
    pub fn new(
        user_id: impl Into<String>,
        org_id: impl Into<String>,
        integration: IntegrationType,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
            integration,
        }
    }

    /// Name of the first missing identity field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.user_id.trim().is_empty() {
            Some("user_id")
        } else if self.org_id.trim().is_empty() {
            Some("org_id")
        } else {
            None
        }
    }
}

/// One-time authorization URL issued by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHandle {
    url: String,
}

impl AuthorizationHandle {
    /// Accepts only a non-blank URL
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Consumes the handle, yielding the URL to open
    pub fn into_url(self) -> String {
        self.url
    }
}

/// Credentials exchanged by the backend after a successful OAuth flow
///
/// The only constructor is [`CredentialBundle::from_response`]: a bundle always
/// originates from a backend credential-retrieval response.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialBundle {
    fields: Map<String, Value>,
}

impl CredentialBundle {
    /// Wraps a backend response body; `None` for null, non-object, or empty responses
    pub fn from_response(body: Value) -> Option<Self> {
        match body {
            Value::Object(fields) if !fields.is_empty() => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.string_field("user_id")
    }

    pub fn org_id(&self) -> Option<&str> {
        self.string_field("org_id")
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Truncated SHA-256 of the access token, safe to log
    pub fn fingerprint(&self) -> Option<String> {
        let token = self.fields.get("access_token")?.as_str()?;
        let digest = Sha256::digest(token.as_bytes());
        Some(hex::encode(&digest[..6]))
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Tri-state connection status, derived from session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Outcome of a credential retrieval
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialStatus {
    Succeeded(CredentialBundle),
    /// The backend holds no credentials yet (flow abandoned or unfinished)
    Pending,
    /// The backend reported the exchange as failed
    Failed(String),
}

/// Contact operations exposed by the HubSpot integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactOperation {
    Get,
    Create,
    Update,
    Delete,
}

impl ContactOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactOperation::Get => "get",
            ContactOperation::Create => "create",
            ContactOperation::Update => "update",
            ContactOperation::Delete => "delete",
        }
    }

    pub fn needs_contact_id(&self) -> bool {
        !matches!(self, ContactOperation::Create)
    }

    pub fn needs_properties(&self) -> bool {
        matches!(self, ContactOperation::Create | ContactOperation::Update)
    }
}

/// Operation-specific fields of a contact request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactFields {
    #[serde(default)]
    pub contact_id: Option<String>,
    /// JSON-encoded key/value map, forwarded as-is
    #[serde(default)]
    pub properties_str: Option<String>,
}
