//! Console API type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::integration::session::SessionSnapshot;
use crate::integration::types::{ConnectionStatus, IntegrationType};

/// Set identity request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetIdentityRequest {
    pub user_id: String,
    pub org_id: String,
    pub integration: IntegrationType,
}

/// Connect response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub status: ConnectionStatus,
    /// URL the surface was opened on
    pub authorization_url: String,
}

/// Generic action response
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn noop(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Backend payload wrapped with the session it was produced for
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub session: SessionSnapshot,
    pub result: Value,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ConsoleErrorResponse {
    pub error: ConsoleErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ConsoleErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ConsoleErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ConsoleErrorBody {
                error_type: error_type.into(),
                message: message.into(),
            },
        }
    }

    pub fn authentication_error() -> Self {
        Self::new("authentication_error", "Invalid or missing admin API key")
    }
}
