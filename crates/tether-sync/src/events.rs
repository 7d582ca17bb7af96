//! Realtime event wire model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_state::ClientKind;

/// Realtime event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AuthStateChange,
    SettingsChange,
    ForceLogout,
    SessionSync,
    Presence,
}

/// An event on a user's realtime topic.
///
/// `source` identifies the originating client *type*; the receiving
/// controller drops events whose source matches its own kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    pub event_type: EventType,
    #[serde(default)]
    pub data: Value,
    /// Wall-clock timestamp at the originator; drives last-write-wins
    /// merging at receivers.
    pub timestamp: DateTime<Utc>,
    pub source: ClientKind,
}

impl RealtimeEvent {
    /// Create an event with no payload, timestamped now.
    pub fn new(event_type: EventType, source: ClientKind) -> Self {
        Self {
            event_type,
            data: Value::Null,
            timestamp: Utc::now(),
            source,
        }
    }

    /// Create a `settings_change` event carrying changed fields.
    pub fn settings_change(source: ClientKind, data: Value) -> Self {
        Self {
            event_type: EventType::SettingsChange,
            data,
            timestamp: Utc::now(),
            source,
        }
    }

    /// Create a `force_logout` event.
    pub fn force_logout(source: ClientKind) -> Self {
        Self::new(EventType::ForceLogout, source)
    }

    /// Create a `session_sync` reconciliation event.
    pub fn session_sync(source: ClientKind, data: Value) -> Self {
        Self {
            event_type: EventType::SessionSync,
            data,
            timestamp: Utc::now(),
            source,
        }
    }

    /// Create an `auth_state_change` event.
    pub fn auth_state_change(source: ClientKind, data: Value) -> Self {
        Self {
            event_type: EventType::AuthStateChange,
            data,
            timestamp: Utc::now(),
            source,
        }
    }

    /// Create a `presence` event.
    pub fn presence(source: ClientKind, data: Value) -> Self {
        Self {
            event_type: EventType::Presence,
            data,
            timestamp: Utc::now(),
            source,
        }
    }

    /// Replace the timestamp (reconciliation and tests).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
