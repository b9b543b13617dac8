//! Redis Pub/Sub for realtime event distribution.
//!
//! The publisher side pushes `RealtimeEvent`s onto per-post and per-user
//! channels; the subscriber side pattern-subscribes to both channel families
//! and fans received messages into a local tokio broadcast for the WebSocket
//! layer. Publishing is a single attempt with no retry and no queue; the
//! store is the source of truth, the relay is an optimization.

#![allow(missing_docs)]

use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use ripple_common::{AppError, AppResult, get_metrics, notification_channel, post_channel};
use ripple_core::services::{ChannelMessage, EventPublisher, PostUpdated, RealtimeEvent};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Subscription patterns covering the two channel families.
pub mod patterns {
    /// Every per-post update channel.
    pub const POSTS: &str = "post-*";
    /// Every per-user notification channel.
    pub const NOTIFICATIONS: &str = "notifications-*";
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<ChannelMessage>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!("Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            local_tx,
        })
    }

    /// Pattern-subscribe to both channel families and start the event loop.
    pub async fn start(&self) -> Result<(), RedisError> {
        self.subscriber.psubscribe(patterns::POSTS).await?;
        self.subscriber.psubscribe(patterns::NOTIFICATIONS).await?;

        info!("Subscribed to Redis Pub/Sub channel patterns");

        // Spawn event loop
        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                let channel = message.channel.to_string();
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<RealtimeEvent>(&payload) {
                        Ok(event) => {
                            debug!(channel, event = event.event_name(), "Received Pub/Sub event");
                            if local_tx.send(ChannelMessage { channel, event }).is_err() {
                                debug!("No local subscribers for Pub/Sub event");
                            }
                        }
                        Err(e) => {
                            warn!(channel, "Failed to parse Pub/Sub message: {}", e);
                        }
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Publish an event to a channel. One attempt, no retry.
    pub async fn publish(&self, channel: &str, event: &RealtimeEvent) -> Result<(), RedisError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;

        match self.publisher.publish::<(), _, _>(channel, payload).await {
            Ok(()) => {
                get_metrics().record_publish();
                debug!(channel, event = event.event_name(), "Published Pub/Sub event");
                Ok(())
            }
            Err(e) => {
                get_metrics().record_publish_failure();
                Err(e)
            }
        }
    }

    /// Get a receiver for local broadcast events.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<ChannelMessage> {
        self.local_tx.subscribe()
    }

    /// Get a handle on the local broadcast sender.
    #[must_use]
    pub fn local_sender(&self) -> broadcast::Sender<ChannelMessage> {
        self.local_tx.clone()
    }

    /// Get the number of local subscribers.
    #[must_use]
    pub fn local_subscriber_count(&self) -> usize {
        self.local_tx.receiver_count()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

/// Implementation of `EventPublisher` for `RedisPubSub`.
/// This allows core services to publish events without depending on the
/// realtime crate directly.
#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish_post_updated(&self, payload: PostUpdated) -> AppResult<()> {
        let channel = post_channel(&payload.post_id);
        self.publish(&channel, &RealtimeEvent::PostUpdated(payload))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }

    async fn publish_new_notification(
        &self,
        recipient_id: &str,
        notification: serde_json::Value,
    ) -> AppResult<()> {
        let channel = notification_channel(recipient_id);
        self.publish(&channel, &RealtimeEvent::NewNotification(notification))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }
}

/// Bridge between Redis Pub/Sub and the WebSocket streaming layer.
pub struct PubSubStreamBridge {
    rx: broadcast::Receiver<ChannelMessage>,
}

impl PubSubStreamBridge {
    /// Create a new bridge.
    #[must_use]
    pub fn new(pubsub: &RedisPubSub) -> Self {
        Self {
            rx: pubsub.subscribe_local(),
        }
    }

    /// Start the bridge, forwarding events to the given callback.
    pub fn start<F>(mut self, on_event: F)
    where
        F: Fn(ChannelMessage) + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            loop {
                match self.rx.recv().await {
                    Ok(message) => on_event(message),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Stream bridge lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Stream bridge channel closed");
                        break;
                    }
                }
            }
        });
    }
}
