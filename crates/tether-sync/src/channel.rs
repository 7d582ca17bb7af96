//! Realtime channel contract and transports.
//!
//! One topic per user identity, carrying [`RealtimeEvent`] JSON payloads.
//! Delivery is at-most-once: no acknowledgement, no redelivery on
//! disconnect, ordering only approximate by timestamp.

use crate::{RealtimeEvent, SyncError, SyncResult};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, warn};

/// Buffer size for per-topic event fan-out. Slow consumers lag and drop,
/// which is within the at-most-once contract.
pub const EVENT_BUFFER: usize = 100;

/// Per-user publish/subscribe topic.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Publish an event to the user's topic. Failure is non-fatal to the
    /// publisher's local state; callers log and continue.
    async fn publish(&self, user_id: &str, event: &RealtimeEvent) -> SyncResult<()>;

    /// Subscribe to the user's topic.
    async fn subscribe(&self, user_id: &str) -> SyncResult<broadcast::Receiver<RealtimeEvent>>;

    /// Tear down this process's interest in the user's topic.
    async fn unsubscribe(&self, user_id: &str) -> SyncResult<()>;
}

/// In-process channel hub.
///
/// Used by single-process deployments and tests. Topics are broadcast
/// channels keyed by user id; publishing to a topic nobody subscribed to
/// is a silent no-op, matching the at-most-once contract.
#[derive(Default)]
pub struct LocalChannelHub {
    topics: Mutex<HashMap<String, broadcast::Sender<RealtimeEvent>>>,
}

impl LocalChannelHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RealtimeChannel for LocalChannelHub {
    async fn publish(&self, user_id: &str, event: &RealtimeEvent) -> SyncResult<()> {
        let topics = self.topics.lock().await;
        if let Some(sender) = topics.get(user_id) {
            // Send errors only mean no live receivers.
            let _ = sender.send(event.clone());
        }
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> SyncResult<broadcast::Receiver<RealtimeEvent>> {
        let mut topics = self.topics.lock().await;
        let sender = topics
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_BUFFER).0);
        Ok(sender.subscribe())
    }

    async fn unsubscribe(&self, user_id: &str) -> SyncResult<()> {
        let mut topics = self.topics.lock().await;
        if let Some(sender) = topics.get(user_id) {
            if sender.receiver_count() <= 1 {
                topics.remove(user_id);
            }
        }
        Ok(())
    }
}

/// A subscribed topic: the local fan-out sender plus the shutdown handle
/// for its reader task. Dropping the entry stops the reader.
struct Topic {
    tx: broadcast::Sender<RealtimeEvent>,
    _shutdown: watch::Sender<bool>,
}

/// Redis pub/sub channel.
///
/// One Redis channel per user id. A reader task per subscribed topic
/// forwards messages into a local broadcast sender. `unsubscribe` drops
/// the topic entry, which signals the reader to exit and release its
/// pub/sub connection immediately rather than waiting for a next message.
pub struct RedisChannel {
    client: redis::Client,
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

/// Channel namespace for realtime events.
const CHANNEL_PREFIX: &str = "tether:events:";

impl RedisChannel {
    /// Create a channel client from a Redis URL.
    pub fn new(url: &str) -> SyncResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            topics: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn channel_name(user_id: &str) -> String {
        format!("{CHANNEL_PREFIX}{user_id}")
    }
}

/// Forward JSON event payloads from a transport stream into a broadcast
/// sender until the stream ends, all local receivers are gone, or the
/// shutdown handle is dropped or signalled.
async fn forward_payloads<S>(
    mut payloads: S,
    tx: broadcast::Sender<RealtimeEvent>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: Stream<Item = String> + Unpin,
{
    loop {
        tokio::select! {
            // Err means the shutdown sender was dropped; stop either way.
            _ = shutdown.changed() => {
                debug!("Topic reader shut down");
                break;
            }
            msg = payloads.next() => {
                let Some(payload) = msg else { break };
                match RealtimeEvent::from_json(&payload) {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            // No local receivers left.
                            debug!("Topic reader exiting");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to parse realtime event");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl RealtimeChannel for RedisChannel {
    async fn publish(&self, user_id: &str, event: &RealtimeEvent) -> SyncResult<()> {
        let payload = event.to_json()?;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SyncError::PublishFailed(e.to_string()))?;
        redis::cmd("PUBLISH")
            .arg(Self::channel_name(user_id))
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| SyncError::PublishFailed(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> SyncResult<broadcast::Receiver<RealtimeEvent>> {
        let mut topics = self.topics.lock().await;
        if let Some(topic) = topics.get(user_id) {
            if topic.tx.receiver_count() > 0 {
                return Ok(topic.tx.subscribe());
            }
        }

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| SyncError::Subscribe(e.to_string()))?;
        pubsub
            .subscribe(Self::channel_name(user_id))
            .await
            .map_err(|e| SyncError::Subscribe(e.to_string()))?;

        let (tx, rx) = broadcast::channel(EVENT_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Replacing a dead topic drops its old shutdown handle, which
        // stops the stale reader too.
        topics.insert(
            user_id.to_string(),
            Topic {
                tx: tx.clone(),
                _shutdown: shutdown_tx,
            },
        );

        tokio::spawn(async move {
            let stream = Box::pin(pubsub.into_on_message().filter_map(|msg| async move {
                match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!(error = %e, "Undecodable pub/sub payload");
                        None
                    }
                }
            }));
            forward_payloads(stream, tx, shutdown_rx).await;
        });

        Ok(rx)
    }

    async fn unsubscribe(&self, user_id: &str) -> SyncResult<()> {
        let mut topics = self.topics.lock().await;
        // Dropping the topic drops its shutdown sender; the reader task
        // observes that and closes its pub/sub connection right away.
        topics.remove(user_id);
        Ok(())
    }
}
