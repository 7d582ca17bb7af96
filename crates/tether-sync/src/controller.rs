//! Sync controller state machine.

use crate::{EventType, RealtimeChannel, RealtimeEvent, SyncError, SyncResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tether_state::{ClientKind, SessionState};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Default bound on channel unsubscribe during termination.
const DEFAULT_UNSUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Buffer size for host notifications.
const HOST_NOTICE_BUFFER: usize = 32;

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Disconnected,
    Connecting,
    Subscribed,
    Terminating,
}

/// Notifications surfaced to the hosting application.
#[derive(Debug, Clone)]
pub enum HostNotice {
    /// The session ended (remote force-logout or local sign-out). The
    /// host should drop its tokens and show a logged-out view.
    LoggedOut,
    /// Local session state changed (merge, metadata refresh, or local
    /// mutation committed).
    StateChanged,
    /// Informational presence payload; no state was mutated.
    Presence(Value),
}

/// A revocable subscription to controller notifications.
///
/// Dropping the handle revokes it; each handle is independent.
pub struct HostHandle {
    rx: broadcast::Receiver<HostNotice>,
}

impl HostHandle {
    /// Receive the next notice, skipping over lag gaps. Returns `None`
    /// once the controller is gone.
    pub async fn recv(&mut self) -> Option<HostNotice> {
        loop {
            match self.rx.recv().await {
                Ok(notice) => return Some(notice),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Host handle lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<HostNotice> {
        self.rx.try_recv().ok()
    }
}

/// Keeps one client's session state synchronized over a per-user topic.
///
/// One logical consumer per client process: inbound events are processed
/// sequentially by [`run`](SyncController::run), and local mutations are
/// serialized on the internal session lock before broadcasting, so
/// interleaved broadcasts can't describe an inconsistent intermediate
/// state.
///
/// Inbound events whose `source` matches this controller's own
/// [`ClientKind`] are discarded before dispatch; a client's own broadcast
/// is never re-applied to itself. Local mutations are applied directly
/// (not routed through inbound dispatch) precisely so the self-origin
/// filter cannot discard them.
pub struct SyncController {
    kind: ClientKind,
    channel: Arc<dyn RealtimeChannel>,
    state: RwLock<SyncState>,
    session: Mutex<Option<SessionState>>,
    inbound: Mutex<Option<broadcast::Receiver<RealtimeEvent>>>,
    host_tx: broadcast::Sender<HostNotice>,
    unsubscribe_timeout: Duration,
}

impl SyncController {
    /// Create a controller for a client of the given kind over an
    /// injected channel.
    pub fn new(kind: ClientKind, channel: Arc<dyn RealtimeChannel>) -> Self {
        let (host_tx, _) = broadcast::channel(HOST_NOTICE_BUFFER);
        Self {
            kind,
            channel,
            state: RwLock::new(SyncState::Disconnected),
            session: Mutex::new(None),
            inbound: Mutex::new(None),
            host_tx,
            unsubscribe_timeout: DEFAULT_UNSUBSCRIBE_TIMEOUT,
        }
    }

    /// Override the unsubscribe timeout used during termination.
    pub fn with_unsubscribe_timeout(mut self, timeout: Duration) -> Self {
        self.unsubscribe_timeout = timeout;
        self
    }

    /// This controller's client kind.
    pub fn client_kind(&self) -> ClientKind {
        self.kind
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SyncState {
        *self.state.read().await
    }

    /// Snapshot of the current session state, if any.
    pub async fn session(&self) -> Option<SessionState> {
        self.session.lock().await.clone()
    }

    /// Subscribe to host notifications. Each returned handle is
    /// individually revocable by dropping it.
    pub fn subscribe_host(&self) -> HostHandle {
        HostHandle {
            rx: self.host_tx.subscribe(),
        }
    }

    /// Connect after successful authentication (local or via redemption).
    ///
    /// Transitions `Disconnected → Connecting → Subscribed`. On
    /// subscription failure the controller returns to `Disconnected` and
    /// the error is handed back; retrying with backoff is the hosting
    /// application's job.
    pub async fn connect(&self, session: SessionState) -> SyncResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != SyncState::Disconnected {
                debug!("Already connecting or connected");
                return Ok(());
            }
            *state = SyncState::Connecting;
        }

        match self.channel.subscribe(&session.user_id).await {
            Ok(rx) => {
                *self.inbound.lock().await = Some(rx);
                *self.session.lock().await = Some(session);
                *self.state.write().await = SyncState::Subscribed;
                info!(kind = %self.kind, "Subscribed to realtime channel");
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = SyncState::Disconnected;
                Err(e)
            }
        }
    }

    /// Consume inbound events sequentially until the session terminates
    /// or the channel closes.
    pub async fn run(&self) -> SyncResult<()> {
        let mut rx = self
            .inbound
            .lock()
            .await
            .take()
            .ok_or(SyncError::NotConnected)?;

        loop {
            match rx.recv().await {
                Ok(event) => {
                    self.handle_event(&event).await;
                    if *self.state.read().await != SyncState::Subscribed {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // At-most-once delivery: dropped events are not
                    // recovered here; reconciliation uses session_sync.
                    warn!(skipped, "Event consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        let mut state = self.state.write().await;
        if *state == SyncState::Subscribed {
            *state = SyncState::Disconnected;
        }
        Ok(())
    }

    /// Dispatch one inbound event. Normally driven by
    /// [`run`](SyncController::run); exposed for hosts that pump their
    /// own loop.
    pub async fn handle_event(&self, event: &RealtimeEvent) {
        if event.source == self.kind {
            debug!(event_type = ?event.event_type, "Dropping self-originated event");
            return;
        }

        match event.event_type {
            EventType::SettingsChange => self.merge_settings(event).await,
            EventType::ForceLogout => self.terminate().await,
            EventType::SessionSync | EventType::AuthStateChange => self.apply_sync(event).await,
            EventType::Presence => {
                let _ = self.host_tx.send(HostNotice::Presence(event.data.clone()));
            }
        }
    }

    /// Commit a local settings change: broadcast it tagged with this
    /// controller's own kind, then apply it directly to local state.
    ///
    /// A publish failure is logged and swallowed — the local change still
    /// applies, the remote side reconciles later via `session_sync`.
    pub async fn update_setting(&self, key: &str, value: Value) -> SyncResult<()> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(SyncError::NotConnected)?;

        let mut data = serde_json::Map::new();
        data.insert(key.to_string(), value.clone());
        let event = RealtimeEvent::settings_change(self.kind, Value::Object(data));

        if let Err(e) = self.channel.publish(&session.user_id, &event).await {
            warn!(error = %e, "Publish failed, applying change locally only");
        }

        session.apply_local_setting(key, value, self.kind);
        drop(guard);

        let _ = self.host_tx.send(HostNotice::StateChanged);
        Ok(())
    }

    /// Sign out locally and propagate a `force_logout` to the user's
    /// other clients.
    pub async fn sign_out(&self) -> SyncResult<()> {
        let user_id = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.user_id.clone());

        if let Some(user_id) = user_id {
            let event = RealtimeEvent::force_logout(self.kind);
            if let Err(e) = self.channel.publish(&user_id, &event).await {
                warn!(error = %e, "Publish failed, signing out locally anyway");
            }
        }

        self.terminate().await;
        Ok(())
    }

    /// Merge a remote settings change, last-write-wins by event
    /// timestamp: fields are only overwritten when the incoming
    /// timestamp is strictly newer than the local `last_sync`. Redelivery
    /// of the same event is therefore a no-op.
    async fn merge_settings(&self, event: &RealtimeEvent) {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return;
        };

        if event.timestamp <= session.last_sync {
            debug!("Stale settings_change, skipping merge");
            return;
        }

        let Some(fields) = event.data.as_object() else {
            warn!("settings_change payload is not an object, skipping");
            return;
        };

        for (key, value) in fields {
            session.settings.insert(key.clone(), value.clone());
        }
        session.last_sync = event.timestamp;
        session.source = event.source;
        drop(guard);

        let _ = self.host_tx.send(HostNotice::StateChanged);
    }

    /// Apply a `session_sync` / `auth_state_change` event: refresh
    /// mirrored, non-authoritative fields. Authentication status only
    /// changes when the payload explicitly carries a logout action.
    async fn apply_sync(&self, event: &RealtimeEvent) {
        if event.data.get("action").and_then(Value::as_str) == Some("logout") {
            self.terminate().await;
            return;
        }

        {
            let mut guard = self.session.lock().await;
            let Some(session) = guard.as_mut() else {
                return;
            };

            if let Some(settings) = event.data.get("settings").and_then(Value::as_object) {
                if event.timestamp > session.last_sync {
                    session.settings = settings.clone();
                    session.last_sync = event.timestamp;
                }
            }
        }

        let _ = self.host_tx.send(HostNotice::StateChanged);
    }

    /// Tear the session down: clear state, unsubscribe (bounded), notify
    /// the host. Idempotent — calling this while already disconnected is
    /// a no-op.
    pub async fn terminate(&self) {
        {
            let mut state = self.state.write().await;
            if *state == SyncState::Disconnected {
                return;
            }
            *state = SyncState::Terminating;
        }

        let session = self.session.lock().await.take();
        self.inbound.lock().await.take();

        if let Some(session) = session {
            let unsubscribe = self.channel.unsubscribe(&session.user_id);
            match tokio::time::timeout(self.unsubscribe_timeout, unsubscribe).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Unsubscribe failed, disconnecting anyway"),
                Err(_) => warn!("Unsubscribe timed out, disconnecting anyway"),
            }
        }

        *self.state.write().await = SyncState::Disconnected;
        info!(kind = %self.kind, "Session terminated");
        let _ = self.host_tx.send(HostNotice::LoggedOut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalChannelHub;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    fn controller(kind: ClientKind, hub: &Arc<LocalChannelHub>) -> SyncController {
        SyncController::new(kind, hub.clone() as Arc<dyn RealtimeChannel>)
    }

    async fn connected(kind: ClientKind, hub: &Arc<LocalChannelHub>) -> SyncController {
        let ctl = controller(kind, hub);
        ctl.connect(SessionState::new("user-1", kind)).await.unwrap();
        ctl
    }

    struct FailingChannel;

    #[async_trait]
    impl RealtimeChannel for FailingChannel {
        async fn publish(&self, _: &str, _: &RealtimeEvent) -> SyncResult<()> {
            Err(SyncError::PublishFailed("boom".into()))
        }
        async fn subscribe(&self, _: &str) -> SyncResult<broadcast::Receiver<RealtimeEvent>> {
            Err(SyncError::Subscribe("boom".into()))
        }
        async fn unsubscribe(&self, _: &str) -> SyncResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_disconnected() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = controller(ClientKind::Desktop, &hub);
        assert_eq!(ctl.state().await, SyncState::Disconnected);
        assert!(ctl.session().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_transitions_to_subscribed() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;
        assert_eq!(ctl.state().await, SyncState::Subscribed);
        assert!(ctl.session().await.is_some());
    }

    #[tokio::test]
    async fn test_subscription_failure_returns_to_disconnected() {
        let ctl = SyncController::new(ClientKind::Desktop, Arc::new(FailingChannel));
        let result = ctl.connect(SessionState::new("user-1", ClientKind::Desktop)).await;

        assert!(matches!(result, Err(SyncError::Subscribe(_))));
        assert_eq!(ctl.state().await, SyncState::Disconnected);
    }

    #[tokio::test]
    async fn test_self_origin_events_are_discarded_for_all_types() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;
        let before = ctl.session().await.unwrap();

        let future = Utc::now() + chrono::Duration::seconds(10);
        let events = vec![
            RealtimeEvent::settings_change(ClientKind::Desktop, json!({"theme": "dark"}))
                .with_timestamp(future),
            RealtimeEvent::force_logout(ClientKind::Desktop),
            RealtimeEvent::session_sync(ClientKind::Desktop, json!({"action": "logout"})),
            RealtimeEvent::auth_state_change(ClientKind::Desktop, json!({"action": "logout"})),
            RealtimeEvent::presence(ClientKind::Desktop, json!({"online": true})),
        ];
        for event in &events {
            ctl.handle_event(event).await;
        }

        // Still subscribed, nothing merged.
        assert_eq!(ctl.state().await, SyncState::Subscribed);
        let after = ctl.session().await.unwrap();
        assert!(after.settings.is_empty());
        assert_eq!(after.last_sync, before.last_sync);
    }

    #[tokio::test]
    async fn test_settings_merge_is_last_write_wins_and_idempotent() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;

        let ts = Utc::now() + chrono::Duration::seconds(1);
        let event = RealtimeEvent::settings_change(ClientKind::Web, json!({"theme": "dark"}))
            .with_timestamp(ts);

        ctl.handle_event(&event).await;
        let once = ctl.session().await.unwrap();
        assert_eq!(once.settings["theme"], json!("dark"));
        assert_eq!(once.last_sync, ts);

        // Redelivery: timestamp is no longer strictly newer, so no-op.
        ctl.handle_event(&event).await;
        let twice = ctl.session().await.unwrap();
        assert_eq!(twice.settings, once.settings);
        assert_eq!(twice.last_sync, ts);
    }

    #[tokio::test]
    async fn test_stale_settings_change_is_ignored() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;

        let stale = RealtimeEvent::settings_change(ClientKind::Web, json!({"theme": "light"}))
            .with_timestamp(Utc::now() - chrono::Duration::seconds(60));
        ctl.handle_event(&stale).await;

        assert!(ctl.session().await.unwrap().settings.is_empty());
    }

    #[tokio::test]
    async fn test_force_logout_is_idempotent() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;
        let mut host = ctl.subscribe_host();

        let event = RealtimeEvent::force_logout(ClientKind::Web);
        ctl.handle_event(&event).await;
        assert_eq!(ctl.state().await, SyncState::Disconnected);
        assert!(ctl.session().await.is_none());
        assert!(matches!(host.try_recv(), Some(HostNotice::LoggedOut)));

        // Second delivery must not error and must stay disconnected.
        ctl.handle_event(&event).await;
        assert_eq!(ctl.state().await, SyncState::Disconnected);
    }

    #[tokio::test]
    async fn test_session_sync_logout_action_terminates() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;

        let event = RealtimeEvent::session_sync(ClientKind::Web, json!({"action": "logout"}));
        ctl.handle_event(&event).await;

        assert_eq!(ctl.state().await, SyncState::Disconnected);
    }

    #[tokio::test]
    async fn test_session_sync_refreshes_settings_without_touching_auth() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;

        let ts = Utc::now() + chrono::Duration::seconds(1);
        let event = RealtimeEvent::session_sync(
            ClientKind::Web,
            json!({"settings": {"theme": "dark", "lang": "en"}}),
        )
        .with_timestamp(ts);
        ctl.handle_event(&event).await;

        assert_eq!(ctl.state().await, SyncState::Subscribed);
        let session = ctl.session().await.unwrap();
        assert_eq!(session.settings["lang"], json!("en"));
        assert_eq!(session.last_sync, ts);
    }

    #[tokio::test]
    async fn test_presence_mutates_nothing() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;
        let mut host = ctl.subscribe_host();
        let before = ctl.session().await.unwrap();

        let event = RealtimeEvent::presence(ClientKind::Web, json!({"online": true}));
        ctl.handle_event(&event).await;

        let after = ctl.session().await.unwrap();
        assert_eq!(after.last_sync, before.last_sync);
        assert!(after.settings.is_empty());
        assert!(matches!(host.try_recv(), Some(HostNotice::Presence(_))));
    }

    #[tokio::test]
    async fn test_local_mutation_broadcasts_tagged_with_own_kind() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = connected(ClientKind::Desktop, &hub).await;
        let mut tap = hub.subscribe("user-1").await.unwrap();

        ctl.update_setting("theme", json!("dark")).await.unwrap();

        let broadcast = tap.recv().await.unwrap();
        assert_eq!(broadcast.event_type, EventType::SettingsChange);
        assert_eq!(broadcast.source, ClientKind::Desktop);
        assert_eq!(broadcast.data["theme"], json!("dark"));

        // Applied locally despite the self-origin filter: local commits
        // bypass inbound dispatch.
        let session = ctl.session().await.unwrap();
        assert_eq!(session.settings["theme"], json!("dark"));
        assert_eq!(session.source, ClientKind::Desktop);
    }

    #[tokio::test]
    async fn test_publish_failure_still_applies_locally() {
        let ctl = SyncController::new(ClientKind::Desktop, Arc::new(FailingChannel));
        // Seed a session directly: connect would fail on this channel.
        *ctl.session.lock().await = Some(SessionState::new("user-1", ClientKind::Desktop));
        *ctl.state.write().await = SyncState::Subscribed;

        ctl.update_setting("theme", json!("dark")).await.unwrap();
        assert_eq!(ctl.session().await.unwrap().settings["theme"], json!("dark"));
    }

    #[tokio::test]
    async fn test_sign_out_propagates_force_logout_to_other_client() {
        let hub = Arc::new(LocalChannelHub::new());
        let web = Arc::new(connected(ClientKind::Web, &hub).await);
        let desktop = connected(ClientKind::Desktop, &hub).await;

        let runner = {
            let web = web.clone();
            tokio::spawn(async move { web.run().await })
        };

        desktop.sign_out().await.unwrap();
        assert_eq!(desktop.state().await, SyncState::Disconnected);

        // Web consumer sees the force_logout and terminates.
        tokio::time::timeout(Duration::from_secs(2), runner)
            .await
            .expect("run() did not finish")
            .unwrap()
            .unwrap();
        assert_eq!(web.state().await, SyncState::Disconnected);
        assert!(web.session().await.is_none());
    }

    #[tokio::test]
    async fn test_update_setting_requires_session() {
        let hub = Arc::new(LocalChannelHub::new());
        let ctl = controller(ClientKind::Desktop, &hub);
        let result = ctl.update_setting("theme", json!("dark")).await;
        assert!(matches!(result, Err(SyncError::NotConnected)));
    }
}
