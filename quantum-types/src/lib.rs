use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Intents suggested when no completion engine is configured, or when it fails.
pub const DEFAULT_NEXT_INTENTS: [&str; 2] = ["refreshSession", "loadUserActivity"];

/// Number of next intents every response carries.
pub const NEXT_INTENT_COUNT: usize = 2;

/// Incoming request body for `POST /quantum`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantumRequest {
    pub intent: String,
    pub user_id: i64,
    #[serde(default)]
    pub cache_keys: Vec<String>,
    pub requested_components: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("userId must be >= 1, got {0}")]
    UserId(i64),
}

impl QuantumRequest {
    /// Field checks serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id < 1 {
            return Err(ValidationError::UserId(self.user_id));
        }
        Ok(())
    }

    pub fn has_cache_key(&self, key: &str) -> bool {
        self.cache_keys.iter().any(|k| k == key)
    }
}

/// Closed set of components a client may request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Profile,
    Permissions,
    Notifications,
    Settings,
    Activity,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Profile,
        Component::Permissions,
        Component::Notifications,
        Component::Settings,
        Component::Activity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Profile => "profile",
            Component::Permissions => "permissions",
            Component::Notifications => "notifications",
            Component::Settings => "settings",
            Component::Activity => "activity",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown component: {0}")]
pub struct UnknownComponent(pub String);

impl FromStr for Component {
    type Err = UnknownComponent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownComponent(s.to_string()))
    }
}

/// Resolved components, keyed by component name on the wire.
pub type ComponentPayload = BTreeMap<Component, Value>;

/// Named client-side formatting snippets, returned verbatim.
pub type MicroFunctions = BTreeMap<String, String>;

/// Response body for `POST /quantum`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantumResponse {
    pub components: ComponentPayload,
    pub micro_functions: MicroFunctions,
    pub next_intents: Vec<String>,
}

/// The part of a response that exists before next intents are chosen.
/// Serialized as the seed handed to the completion engine.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResponse<'a> {
    pub components: &'a ComponentPayload,
    pub micro_functions: &'a MicroFunctions,
}

/// One persisted request. Unlike the request body, rows use snake_case
/// field names on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    pub id: i64,
    pub intent: String,
    pub user_id: i64,
    pub cache_keys: Vec<String>,
    pub requested_components: Vec<String>,
    pub created_at: String,
}

/// Response body for `GET /quantum/history`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub count: usize,
    pub history: Vec<AuditRow>,
}

impl From<Vec<AuditRow>> for HistoryPage {
    fn from(history: Vec<AuditRow>) -> Self {
        Self {
            count: history.len(),
            history,
        }
    }
}
