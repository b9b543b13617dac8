//! Like service.
//!
//! The like toggle is the canonical mutation of the fan-out pipeline: write
//! the toggle row, maintain the denormalized counter in the same logical
//! unit, notify on the creation transition only, then publish best-effort.

use crate::services::event_publisher::{EventPublisherService, PostUpdated};
use crate::services::notification::NotificationService;
use chrono::Utc;
use ripple_common::{AppResult, IdGenerator, get_metrics};
use ripple_db::{
    entities::{like, notification::NotificationType, post},
    repositories::{LikeRepository, PostRepository},
};
use sea_orm::Set;
use std::sync::atomic::Ordering;

/// Result of a like toggle.
#[derive(Debug, Clone)]
pub struct LikeToggle {
    /// Whether the user likes the post after the toggle.
    pub liked: bool,
    /// The post re-read after the counter update; its `like_count` is the
    /// authoritative value to return to the client.
    pub post: post::Model,
}

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    post_repo: PostRepository,
    notifications: NotificationService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub const fn new(
        like_repo: LikeRepository,
        post_repo: PostRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            like_repo,
            post_repo,
            notifications,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Toggle a like on a post.
    ///
    /// Creates the unique (user, post) row and increments the counter, or
    /// deletes it and decrements. The response counter is read back from the
    /// store after the write so concurrent likers never see a stale value
    /// computed client-side.
    pub async fn toggle(&self, user_id: &str, post_id: &str) -> AppResult<LikeToggle> {
        // 404 before touching the like table
        self.post_repo.get_by_id(post_id).await?;

        let existing = self.like_repo.find_by_user_and_post(user_id, post_id).await?;

        let liked = if let Some(like) = existing {
            self.like_repo.delete(&like.id).await?;
            self.post_repo.decrement_like_count(post_id).await?;
            get_metrics().likes_removed.fetch_add(1, Ordering::Relaxed);
            false
        } else {
            let model = like::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                post_id: Set(post_id.to_string()),
                created_at: Set(Utc::now().into()),
            };
            self.like_repo.create(model).await?;
            self.post_repo.increment_like_count(post_id).await?;
            get_metrics().likes_created.fetch_add(1, Ordering::Relaxed);

            // Only the creation transition notifies; unlike never does
            self.notifications
                .create(NotificationType::Like, user_id, post_id, None)
                .await;
            true
        };

        let post = self.post_repo.get_by_id(post_id).await?;

        // Best-effort publish; the toggle is already committed
        if let Some(ref event_publisher) = self.event_publisher {
            let payload = PostUpdated {
                post_id: post.id.clone(),
                like_count: post.like_count,
                comment_count: post.comment_count,
                repost_count: post.repost_count,
                liked: Some(liked),
                new_comment: None,
                new_repost: None,
                user_id: user_id.to_string(),
            };
            if let Err(e) = event_publisher.publish_post_updated(payload).await {
                tracing::warn!(error = %e, post_id, "Failed to publish post-updated event");
            }
        }

        Ok(LikeToggle { liked, post })
    }

    /// Has the user liked the post?
    pub async fn has_liked(&self, user_id: &str, post_id: &str) -> AppResult<bool> {
        self.like_repo.has_liked(user_id, post_id).await
    }

    /// Ids of posts the user has liked.
    pub async fn liked_post_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.like_repo.find_post_ids_by_user(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::NotificationService;
    use ripple_common::AppError;
    use ripple_db::entities::user;
    use ripple_db::repositories::{CommentRepository, NotificationRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_post(id: &str, author_id: &str, like_count: i32) -> post::Model {
        post::Model {
            id: id.to_string(),
            title: None,
            content: Some("Test post".to_string()),
            author_id: author_id.to_string(),
            repost_of_id: None,
            like_count,
            comment_count: 0,
            repost_count: 0,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_like(id: &str, user_id: &str, post_id: &str) -> like::Model {
        like::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn empty_db() -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn notification_service(
        post_db: Arc<sea_orm::DatabaseConnection>,
        user_db: Arc<sea_orm::DatabaseConnection>,
        notification_db: Arc<sea_orm::DatabaseConnection>,
    ) -> NotificationService {
        NotificationService::new(
            NotificationRepository::new(notification_db),
            PostRepository::new(post_db),
            UserRepository::new(user_db),
            CommentRepository::new(empty_db()),
        )
    }

    #[tokio::test]
    async fn test_toggle_post_not_found() {
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let service = LikeService::new(
            LikeRepository::new(empty_db()),
            PostRepository::new(post_db),
            notification_service(empty_db(), empty_db(), empty_db()),
        );

        let result = service.toggle("u1", "missing").await;
        match result {
            Err(AppError::PostNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected PostNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_toggle_unlike_deletes_and_decrements() {
        // Like row exists: delete it, decrement, no notification
        let like_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // find_by_user_and_post
                .append_query_results([[create_test_like("l1", "u1", "p1")]])
                // delete: find_by_id then delete
                .append_query_results([[create_test_like("l1", "u1", "p1")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // existence check
                .append_query_results([[create_test_post("p1", "u2", 1)]])
                // decrement
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                // read-back
                .append_query_results([[create_test_post("p1", "u2", 0)]])
                .into_connection(),
        );

        let service = LikeService::new(
            LikeRepository::new(like_db),
            PostRepository::new(post_db),
            notification_service(empty_db(), empty_db(), empty_db()),
        );

        let result = service.toggle("u1", "p1").await.unwrap();
        assert!(!result.liked);
        assert_eq!(result.post.like_count, 0);
    }

    #[tokio::test]
    async fn test_toggle_like_creates_and_notifies() {
        // No like row yet: create it, increment, notify the author
        let like_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // find_by_user_and_post -> none
                .append_query_results([Vec::<like::Model>::new()])
                // insert returning
                .append_query_results([[create_test_like("l1", "u1", "p1")]])
                .into_connection(),
        );
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // existence check
                .append_query_results([[create_test_post("p1", "u2", 0)]])
                // increment
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                // read-back
                .append_query_results([[create_test_post("p1", "u2", 1)]])
                .into_connection(),
        );

        // Notification engine sees the post, the sender, and stores a row
        let notif_post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u2", 1)]])
                .into_connection(),
        );
        let notif_user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user::Model {
                    id: "u1".to_string(),
                    name: "Alice".to_string(),
                    image: None,
                    api_token: "token-u1".to_string(),
                    created_at: Utc::now().into(),
                }]])
                .into_connection(),
        );
        let notif_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[ripple_db::entities::notification::Model {
                    id: "n1".to_string(),
                    recipient_id: "u2".to_string(),
                    sender_id: "u1".to_string(),
                    notification_type: NotificationType::Like,
                    content: "Alice liked your post".to_string(),
                    post_id: Some("p1".to_string()),
                    comment_id: None,
                    is_read: false,
                    created_at: Utc::now().into(),
                }]])
                .into_connection(),
        );

        let service = LikeService::new(
            LikeRepository::new(like_db),
            PostRepository::new(post_db),
            notification_service(notif_post_db, notif_user_db, notif_db),
        );

        let result = service.toggle("u1", "p1").await.unwrap();
        assert!(result.liked);
        assert_eq!(result.post.like_count, 1);
    }
}
