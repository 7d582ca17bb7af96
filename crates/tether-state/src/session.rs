//! Session state snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which kind of client originated a session or event.
///
/// This tags the client *type*, not a unique instance. Two desktop
/// sessions for the same user share the `Desktop` tag and will filter
/// each other's broadcasts as self-origin (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Web,
    Desktop,
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientKind::Web => write!(f, "web"),
            ClientKind::Desktop => write!(f, "desktop"),
        }
    }
}

/// Last-known session state mirrored by one client process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Unique id for this session.
    pub session_id: String,
    /// The authenticated user this session belongs to.
    pub user_id: String,
    /// Timestamp of the last committed change (local or merged remote).
    pub last_sync: DateTime<Utc>,
    /// Origin of the last committed change.
    pub source: ClientKind,
    /// User settings snapshot.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl SessionState {
    /// Create a fresh session for `user_id` owned by a `source` client.
    pub fn new(user_id: impl Into<String>, source: ClientKind) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            last_sync: Utc::now(),
            source,
            settings: Map::new(),
        }
    }

    /// Commit a local settings change: set the key, bump `last_sync`,
    /// and mark this client as the origin.
    pub fn apply_local_setting(&mut self, key: &str, value: Value, origin: ClientKind) {
        self.settings.insert(key.to_string(), value);
        self.last_sync = Utc::now();
        self.source = origin;
    }
}
