//! Event publisher service.
//!
//! Provides an abstraction for publishing real-time events.
//! The actual implementation is provided by the realtime crate (Redis
//! Pub/Sub). Publishing is best-effort with a single attempt: callers catch
//! and log failures, and a dropped event is never an error on the mutation
//! path. Clients that miss a push see correct state on the next full fetch.

use async_trait::async_trait;
use ripple_common::{notification_channel, post_channel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ripple_common::AppResult;

/// Payload of a `post-updated` event.
///
/// Counters are absolute values read back after the mutation committed, so
/// receivers reconcile by overwrite rather than by delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdated {
    /// The affected post.
    pub post_id: String,
    /// Fresh like count.
    pub like_count: i32,
    /// Fresh comment count.
    pub comment_count: i32,
    /// Fresh repost count.
    pub repost_count: i32,
    /// Whether the acting user now likes the post (like toggles only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
    /// The created comment, when the event came from a comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_comment: Option<serde_json::Value>,
    /// The created repost wrapper, when the event came from a repost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_repost: Option<serde_json::Value>,
    /// The acting user. Receivers whose identity matches discard the event
    /// (their optimistic update is already authoritative).
    pub user_id: String,
}

/// Events on the realtime layer, tagged by wire event name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    /// Counters on a post changed.
    PostUpdated(PostUpdated),
    /// A notification was created for the channel's owner.
    NewNotification(serde_json::Value),
}

impl RealtimeEvent {
    /// Wire name of this event.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::PostUpdated(_) => "post-updated",
            Self::NewNotification(_) => "new-notification",
        }
    }

    /// The channel this event is published on.
    #[must_use]
    pub fn channel(&self, recipient_id: Option<&str>) -> Option<String> {
        match self {
            Self::PostUpdated(payload) => Some(post_channel(&payload.post_id)),
            Self::NewNotification(_) => recipient_id.map(notification_channel),
        }
    }
}

/// A realtime event paired with the channel it travelled on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Channel name, always produced by `ripple_common::channels`.
    pub channel: String,
    /// The event itself.
    #[serde(flatten)]
    pub event: RealtimeEvent,
}

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events
/// without directly depending on the pub/sub implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a `post-updated` event on the post's channel.
    async fn publish_post_updated(&self, payload: PostUpdated) -> AppResult<()>;

    /// Publish a `new-notification` event on the recipient's personal
    /// notification channel.
    async fn publish_new_notification(
        &self,
        recipient_id: &str,
        notification: serde_json::Value,
    ) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when real-time
/// events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_post_updated(&self, _payload: PostUpdated) -> AppResult<()> {
        Ok(())
    }

    async fn publish_new_notification(
        &self,
        _recipient_id: &str,
        _notification: serde_json::Value,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn post_updated(post_id: &str, user_id: &str) -> PostUpdated {
        PostUpdated {
            post_id: post_id.to_string(),
            like_count: 1,
            comment_count: 0,
            repost_count: 0,
            liked: Some(true),
            new_comment: None,
            new_repost: None,
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn test_post_updated_serialization() {
        let event = RealtimeEvent::PostUpdated(post_updated("p1", "u1"));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"post-updated\""));
        assert!(json.contains("\"postId\":\"p1\""));
        assert!(json.contains("\"likeCount\":1"));
        assert!(json.contains("\"userId\":\"u1\""));
        // Unset optional fields stay off the wire
        assert!(!json.contains("newComment"));

        let parsed: RealtimeEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, RealtimeEvent::PostUpdated(_)));
    }

    #[test]
    fn test_new_notification_serialization() {
        let event =
            RealtimeEvent::NewNotification(serde_json::json!({ "id": "n1", "type": "like" }));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"new-notification\""));

        let parsed: RealtimeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_name(), "new-notification");
    }

    #[test]
    fn test_event_channel_derivation() {
        let event = RealtimeEvent::PostUpdated(post_updated("p1", "u1"));
        assert_eq!(event.channel(None).as_deref(), Some("post-p1"));

        let event = RealtimeEvent::NewNotification(serde_json::json!({}));
        assert_eq!(
            event.channel(Some("u2")).as_deref(),
            Some("notifications-u2")
        );
    }

    #[test]
    fn test_channel_message_flattens_event() {
        let msg = ChannelMessage {
            channel: "post-p1".to_string(),
            event: RealtimeEvent::PostUpdated(post_updated("p1", "u1")),
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"channel\":\"post-p1\""));
        assert!(json.contains("\"event\":\"post-updated\""));

        let parsed: ChannelMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.channel, "post-p1");
    }
}
