//! Notification service.
//!
//! Converts a domain event (like/comment/repost) into zero-or-one persisted
//! notification rows, then pushes the hydrated record on the recipient's
//! personal channel. Everything here is off the mutation endpoints' critical
//! path: a failure is logged and swallowed, never propagated to the caller.

use crate::services::event_publisher::EventPublisherService;
use chrono::Utc;
use ripple_common::{AppResult, IdGenerator, get_metrics};
use ripple_db::{
    entities::{comment, notification, notification::NotificationType, post, user},
    repositories::{CommentRepository, NotificationRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::Ordering;

/// A user as embedded in notification payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorView {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&user::Model> for ActorView {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            image: u.image.clone(),
        }
    }
}

/// The post a notification refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPostRef {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// The comment a notification refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCommentRef {
    pub id: String,
    pub content: String,
}

/// A hydrated notification as sent to clients (list responses and the
/// `new-notification` push share this shape).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub content: String,
    pub read: bool,
    pub created_at: String,
    pub sender: ActorView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<NotificationPostRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<NotificationCommentRef>,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    comment_repo: CommentRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            notification_repo,
            post_repo,
            user_repo,
            comment_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Create a notification for an action on a post.
    ///
    /// Returns `None` when suppressed (self-action), when the target post is
    /// gone, or when anything fails. The mutation that triggered us has
    /// already committed and must not be unwound.
    pub async fn create(
        &self,
        notification_type: NotificationType,
        sender_id: &str,
        post_id: &str,
        comment_id: Option<&str>,
    ) -> Option<notification::Model> {
        match self
            .try_create(notification_type, sender_id, post_id, comment_id)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(error = %e, sender_id, post_id, "Failed to create notification");
                None
            }
        }
    }

    async fn try_create(
        &self,
        notification_type: NotificationType,
        sender_id: &str,
        post_id: &str,
        comment_id: Option<&str>,
    ) -> AppResult<Option<notification::Model>> {
        let Some(post) = self.post_repo.find_by_id(post_id).await? else {
            tracing::warn!(post_id, "Notification target post not found");
            return Ok(None);
        };

        // Self-action suppression: the recipient is the post's author, so
        // acting on one's own post never creates a row.
        if post.author_id == sender_id {
            get_metrics()
                .notifications_suppressed
                .fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let sender = self.user_repo.get_by_id(sender_id).await?;
        let content = render_content(&notification_type, &sender.name);

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(post.author_id.clone()),
            sender_id: Set(sender_id.to_string()),
            notification_type: Set(notification_type),
            content: Set(content),
            post_id: Set(Some(post_id.to_string())),
            comment_id: Set(comment_id.map(std::string::ToString::to_string)),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let notification = self.notification_repo.create(model).await?;
        get_metrics()
            .notifications_created
            .fetch_add(1, Ordering::Relaxed);

        // Push the hydrated record on the recipient's personal channel.
        // Best-effort: the row is already durable.
        if let Some(ref event_publisher) = self.event_publisher {
            let comment = match comment_id {
                Some(id) => self.comment_repo.find_by_id(id).await.unwrap_or_default(),
                None => None,
            };
            let view = build_view(&notification, &sender, Some(&post), comment.as_ref());

            match serde_json::to_value(&view) {
                Ok(payload) => {
                    if let Err(e) = event_publisher
                        .publish_new_notification(&notification.recipient_id, payload)
                        .await
                    {
                        tracing::warn!(error = %e, "Failed to publish notification event");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize notification payload");
                }
            }
        }

        Ok(Some(notification))
    }

    /// Get hydrated notifications for a user, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<NotificationView>> {
        let notifications = self
            .notification_repo
            .find_by_recipient(user_id, limit, until_id)
            .await?;

        if notifications.is_empty() {
            return Ok(vec![]);
        }

        let sender_ids: Vec<String> = notifications.iter().map(|n| n.sender_id.clone()).collect();
        let post_ids: Vec<String> = notifications.iter().filter_map(|n| n.post_id.clone()).collect();
        let comment_ids: Vec<String> = notifications
            .iter()
            .filter_map(|n| n.comment_id.clone())
            .collect();

        let senders: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let posts: HashMap<String, post::Model> = self
            .post_repo
            .find_by_ids(&post_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let comments: HashMap<String, comment::Model> = self
            .comment_repo
            .find_by_ids(&comment_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let views = notifications
            .iter()
            .filter_map(|n| {
                // A notification without a resolvable sender is unrenderable;
                // skip it rather than fail the whole list.
                let sender = senders.get(&n.sender_id)?;
                let post = n.post_id.as_ref().and_then(|id| posts.get(id));
                let comment = n.comment_id.as_ref().and_then(|id| comments.get(id));
                Some(build_view(n, sender, post, comment))
            })
            .collect();

        Ok(views)
    }

    /// Mark the given notifications as read for the caller. Idempotent.
    pub async fn mark_as_read(&self, user_id: &str, ids: &[String]) -> AppResult<u64> {
        self.notification_repo.mark_many_as_read(user_id, ids).await
    }

    /// Count unread notifications, degrading to zero on store failure.
    pub async fn count_unread(&self, user_id: &str) -> u64 {
        match self.notification_repo.count_unread(user_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, user_id, "Failed to count unread notifications");
                0
            }
        }
    }
}

/// Render notification content from a fixed per-type template.
fn render_content(notification_type: &NotificationType, sender_name: &str) -> String {
    match notification_type {
        NotificationType::Like => format!("{sender_name} liked your post"),
        NotificationType::Comment => format!("{sender_name} commented on your post"),
        NotificationType::Repost => format!("{sender_name} reposted your post"),
    }
}

fn build_view(
    notification: &notification::Model,
    sender: &user::Model,
    post: Option<&post::Model>,
    comment: Option<&comment::Model>,
) -> NotificationView {
    NotificationView {
        id: notification.id.clone(),
        notification_type: notification.notification_type.as_str().to_string(),
        content: notification.content.clone(),
        read: notification.is_read,
        created_at: notification.created_at.to_rfc3339(),
        sender: sender.into(),
        post: post.map(|p| NotificationPostRef {
            id: p.id.clone(),
            title: p.title.clone(),
            content: p.content.clone(),
        }),
        comment: comment.map(|c| NotificationCommentRef {
            id: c.id.clone(),
            content: c.content.clone(),
        }),
    }
}
