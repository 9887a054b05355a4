use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Identifier as a provider sends it: some providers use JSON strings, others numbers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Text(text) => f.write_str(text),
            WireId::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for WireId {
    fn from(value: &str) -> Self {
        WireId::Text(value.to_string())
    }
}

impl From<u64> for WireId {
    fn from(value: u64) -> Self {
        WireId::Number(value.into())
    }
}

/// Account payload handed over once per successful provider authorization
///
/// Field names follow the Notion token response. `provider` is filled in by the
/// adapter that performed the exchange.
#[derive(Deserialize, Clone, Default)]
pub struct ProviderAccount {
    #[serde(default)]
    pub provider: String,
    pub access_token: Option<String>,
    pub bot_id: Option<WireId>,
    pub workspace_id: Option<WireId>,
    pub workspace_name: Option<String>,
    pub workspace_icon: Option<String>,
}

impl ProviderAccount {
    /// The access token, if the provider actually issued a non-empty one
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }
}

impl fmt::Debug for ProviderAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAccount")
            .field("provider", &self.provider)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("bot_id", &self.bot_id)
            .field("workspace_id", &self.workspace_id)
            .field("workspace_name", &self.workspace_name)
            .field("workspace_icon", &self.workspace_icon)
            .finish()
    }
}

/// Provider that authenticated the session
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Notion,
}

impl AuthType {
    /// Map a provider identifier onto a known auth type
    ///
    /// Unknown providers yield `None` instead of an error.
    #[must_use]
    pub fn from_provider(provider: &str) -> Option<Self> {
        match provider {
            "notion" => Some(Self::Notion),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notion => "notion",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

/// Canonical server-side claims sealed into the session token
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub access_token: String,
    pub bot_id: String,
    pub auth_type: Option<AuthType>,
    pub workspace: Workspace,
    pub authenticated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("access_token", &"<redacted>")
            .field("bot_id", &self.bot_id)
            .field("auth_type", &self.auth_type)
            .field("workspace", &self.workspace)
            .field("authenticated_at", &self.authenticated_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Workspace as shown to clients: no internal id
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WorkspaceView {
    pub name: String,
    pub icon: Option<String>,
}

/// Public session view returned to callers asking who is logged in
///
/// Has no field that can carry the access token or the workspace id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientSession {
    pub auth_type: Option<AuthType>,
    pub workspace: WorkspaceView,
    pub expires: DateTime<Utc>,
}
