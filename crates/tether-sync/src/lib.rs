//! Bidirectional realtime session synchronization.
//!
//! After a handoff both clients keep their session state aligned through
//! a per-user pub/sub topic: settings changes merge last-write-wins,
//! forced sign-out propagates, presence is informational. The
//! [`SyncController`] filters self-originated events so a client's own
//! broadcast is never re-applied to itself.
//!
//! Delivery is at-most-once and only approximately ordered; anything
//! needing stronger guarantees reconciles through `session_sync` events
//! rather than relying on broadcast delivery.

mod channel;
mod controller;
mod error;
mod events;

pub use channel::{LocalChannelHub, RealtimeChannel, RedisChannel, EVENT_BUFFER};
pub use controller::{HostHandle, HostNotice, SyncController, SyncState};
pub use error::{SyncError, SyncResult};
pub use events::{EventType, RealtimeEvent};
