//! Comment service.

use crate::services::event_publisher::{EventPublisherService, PostUpdated};
use crate::services::notification::NotificationService;
use chrono::Utc;
use ripple_common::{AppError, AppResult, IdGenerator, get_metrics};
use ripple_db::{
    entities::{comment, notification::NotificationType, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use validator::Validate;

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentInput {
    /// Comment text.
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

/// A comment together with its author.
#[derive(Debug, Clone)]
pub struct CommentDetail {
    /// The comment row.
    pub comment: comment::Model,
    /// The comment's author.
    pub author: user::Model,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            notifications,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Append a comment to a post.
    pub async fn create(
        &self,
        author_id: &str,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentDetail> {
        input.validate()?;
        if input.content.trim().is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        // 404 before writing anything
        self.post_repo.get_by_id(post_id).await?;
        let author = self.user_repo.get_by_id(author_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            content: Set(input.content.clone()),
            author_id: Set(author_id.to_string()),
            post_id: Set(post_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        self.post_repo.increment_comment_count(post_id).await?;
        get_metrics()
            .comments_created
            .fetch_add(1, Ordering::Relaxed);

        self.notifications
            .create(NotificationType::Comment, author_id, post_id, Some(&comment.id))
            .await;

        // Read back fresh counters, then publish best-effort with the new
        // comment embedded so viewers can append without refetching
        let post = self.post_repo.get_by_id(post_id).await?;

        if let Some(ref event_publisher) = self.event_publisher {
            let payload = PostUpdated {
                post_id: post.id.clone(),
                like_count: post.like_count,
                comment_count: post.comment_count,
                repost_count: post.repost_count,
                liked: None,
                new_comment: Some(json!({
                    "id": comment.id.clone(),
                    "content": comment.content.clone(),
                    "createdAt": comment.created_at.to_rfc3339(),
                    "author": {
                        "id": author.id.clone(),
                        "name": author.name.clone(),
                        "image": author.image.clone(),
                    },
                })),
                new_repost: None,
                user_id: author_id.to_string(),
            };
            if let Err(e) = event_publisher.publish_post_updated(payload).await {
                tracing::warn!(error = %e, post_id, "Failed to publish post-updated event");
            }
        }

        Ok(CommentDetail { comment, author })
    }

    /// Get a post's comments with their authors, creation order.
    pub async fn list(&self, post_id: &str) -> AppResult<Vec<CommentDetail>> {
        let comments = self.comment_repo.find_by_post(post_id).await?;
        if comments.is_empty() {
            return Ok(vec![]);
        }

        let author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(comments
            .into_iter()
            .filter_map(|c| {
                let author = authors.get(&c.author_id)?.clone();
                Some(CommentDetail { comment: c, author })
            })
            .collect())
    }
}
