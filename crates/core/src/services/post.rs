//! Post service.
//!
//! Posts and repost wrappers share one table; a wrapper is a post row whose
//! `repost_of_id` points at the original. The repost operation is idempotent
//! at the store level: one wrapper per (author, original), enforced by a
//! partial unique index and checked with a direct query.

use crate::services::event_publisher::{EventPublisherService, PostUpdated};
use crate::services::notification::NotificationService;
use chrono::Utc;
use ripple_common::{AppError, AppResult, IdGenerator, get_metrics};
use ripple_db::{
    entities::{notification::NotificationType, post, user},
    repositories::{PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use validator::Validate;

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostInput {
    /// Optional title.
    #[validate(length(max = 256))]
    pub title: Option<String>,
    /// Post text.
    #[serde(default)]
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// A post hydrated with its author and, for repost wrappers, the original
/// (one level only).
#[derive(Debug, Clone)]
pub struct PostDetail {
    /// The post row.
    pub post: post::Model,
    /// The post's author, when still present.
    pub author: Option<user::Model>,
    /// The hydrated original for repost wrappers.
    pub repost_of: Option<Box<PostDetail>>,
}

/// Result of a repost call.
#[derive(Debug, Clone)]
pub struct RepostOutcome {
    /// The wrapper row (existing or newly created).
    pub repost: post::Model,
    /// The original post, re-read after any counter update.
    pub original: PostDetail,
    /// The reposting user.
    pub reposted_by: user::Model,
    /// Whether this call created the wrapper.
    pub created: bool,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
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

    /// Create a new post.
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        input.validate()?;
        if input.content.trim().is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            content: Set(Some(input.content)),
            author_id: Set(author_id.to_string()),
            repost_of_id: Set(None),
            like_count: Set(0),
            comment_count: Set(0),
            repost_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let post = self.post_repo.create(model).await?;
        get_metrics().posts_created.fetch_add(1, Ordering::Relaxed);
        Ok(post)
    }

    /// Get a single post, hydrated.
    pub async fn get_detail(&self, id: &str) -> AppResult<PostDetail> {
        let post = self.post_repo.get_by_id(id).await?;
        let mut details = self.hydrate(vec![post]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Get the feed, newest first, hydrated.
    pub async fn feed(&self, limit: u64, until_id: Option<&str>) -> AppResult<Vec<PostDetail>> {
        let posts = self.post_repo.find_feed(limit, until_id).await?;
        self.hydrate(posts).await
    }

    /// Naive substring search over title and content.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<PostDetail>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(vec![]);
        }
        let posts = self.post_repo.search(trimmed, limit).await?;
        self.hydrate(posts).await
    }

    /// Repost a post.
    ///
    /// Idempotent: a second call by the same user returns the existing
    /// wrapper without incrementing the counter or notifying again.
    pub async fn repost(&self, user_id: &str, original_post_id: &str) -> AppResult<RepostOutcome> {
        let target = self.post_repo.get_by_id(original_post_id).await?;

        // Reposting a wrapper targets its original; chains never nest
        let target = match target.repost_of_id {
            Some(ref inner_id) => self.post_repo.get_by_id(inner_id).await?,
            None => target,
        };

        let reposted_by = self.user_repo.get_by_id(user_id).await?;

        if let Some(existing) = self.post_repo.find_repost_by_user(user_id, &target.id).await? {
            let original = self.get_detail(&target.id).await?;
            return Ok(RepostOutcome {
                repost: existing,
                original,
                reposted_by,
                created: false,
            });
        }

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(None),
            content: Set(None),
            author_id: Set(user_id.to_string()),
            repost_of_id: Set(Some(target.id.clone())),
            like_count: Set(0),
            comment_count: Set(0),
            repost_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let repost = self.post_repo.create(model).await?;
        self.post_repo.increment_repost_count(&target.id).await?;
        get_metrics().reposts_created.fetch_add(1, Ordering::Relaxed);

        self.notifications
            .create(NotificationType::Repost, user_id, &target.id, None)
            .await;

        let original = self.get_detail(&target.id).await?;

        if let Some(ref event_publisher) = self.event_publisher {
            let payload = PostUpdated {
                post_id: original.post.id.clone(),
                like_count: original.post.like_count,
                comment_count: original.post.comment_count,
                repost_count: original.post.repost_count,
                liked: None,
                new_comment: None,
                new_repost: Some(json!({
                    "id": repost.id.clone(),
                    "createdAt": repost.created_at.to_rfc3339(),
                    "author": {
                        "id": reposted_by.id.clone(),
                        "name": reposted_by.name.clone(),
                        "image": reposted_by.image.clone(),
                    },
                })),
                user_id: user_id.to_string(),
            };
            if let Err(e) = event_publisher.publish_post_updated(payload).await {
                tracing::warn!(error = %e, post_id = %original.post.id, "Failed to publish post-updated event");
            }
        }

        Ok(RepostOutcome {
            repost,
            original,
            reposted_by,
            created: true,
        })
    }

    /// Hydrate posts with authors and one level of originals.
    async fn hydrate(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostDetail>> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let original_ids: Vec<String> = posts
            .iter()
            .filter_map(|p| p.repost_of_id.clone())
            .collect();
        let originals: HashMap<String, post::Model> = self
            .post_repo
            .find_by_ids(&original_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.extend(originals.values().map(|p| p.author_id.clone()));
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(posts
            .into_iter()
            .map(|p| {
                let repost_of = p.repost_of_id.as_ref().and_then(|id| {
                    originals.get(id).map(|o| {
                        Box::new(PostDetail {
                            post: o.clone(),
                            author: authors.get(&o.author_id).cloned(),
                            repost_of: None,
                        })
                    })
                });
                let author = authors.get(&p.author_id).cloned();
                PostDetail {
                    post: p,
                    author,
                    repost_of,
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ripple_db::repositories::{CommentRepository, NotificationRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            title: None,
            content: Some("Test post".to_string()),
            author_id: author_id.to_string(),
            repost_of_id: None,
            like_count: 0,
            comment_count: 0,
            repost_count: 0,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_user(id: &str, name: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: name.to_string(),
            image: None,
            api_token: format!("token-{id}"),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_repost(id: &str, author_id: &str, original_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            title: None,
            content: None,
            author_id: author_id.to_string(),
            repost_of_id: Some(original_id.to_string()),
            like_count: 0,
            comment_count: 0,
            repost_count: 0,
            created_at: Utc::now().into(),
        }
    }

    fn empty_db() -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn notification_service() -> NotificationService {
        NotificationService::new(
            NotificationRepository::new(empty_db()),
            PostRepository::new(empty_db()),
            UserRepository::new(empty_db()),
            CommentRepository::new(empty_db()),
        )
    }

    fn service(
        post_db: Arc<sea_orm::DatabaseConnection>,
        user_db: Arc<sea_orm::DatabaseConnection>,
    ) -> PostService {
        PostService::new(
            PostRepository::new(post_db),
            UserRepository::new(user_db),
            notification_service(),
        )
    }

    #[tokio::test]
    async fn test_create_rejects_blank_content() {
        let service = service(empty_db(), empty_db());

        let result = service
            .create(
                "u1",
                CreatePostInput {
                    title: None,
                    content: "  ".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_title() {
        let service = service(empty_db(), empty_db());

        let result = service
            .create(
                "u1",
                CreatePostInput {
                    title: Some("t".repeat(300)),
                    content: "hello".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_repost_missing_original_is_not_found() {
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let service = service(post_db, empty_db());

        let result = service.repost("u1", "missing").await;
        match result {
            Err(AppError::PostNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected PostNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_repost_twice_returns_existing_wrapper() {
        let original = create_test_post("p1", "u2");
        let existing = create_test_repost("r1", "u1", "p1");

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // get_by_id(original)
                .append_query_results([[original.clone()]])
                // find_repost_by_user -> existing wrapper
                .append_query_results([[existing.clone()]])
                // get_detail: get_by_id + hydrate find_by_ids (no originals)
                .append_query_results([[original.clone()]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // reposted_by lookup
                .append_query_results([[create_test_user("u1", "Alice")]])
                // hydrate authors
                .append_query_results([[create_test_user("u2", "Bob")]])
                .into_connection(),
        );

        let service = service(post_db, user_db);

        let outcome = service.repost("u1", "p1").await.unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.repost.id, "r1");
        // Counter untouched: still the value the store returned
        assert_eq!(outcome.original.post.repost_count, 0);
    }

    #[tokio::test]
    async fn test_repost_of_wrapper_targets_original() {
        let original = create_test_post("p1", "u3");
        let wrapper = create_test_repost("r1", "u2", "p1");
        let existing = create_test_repost("r2", "u1", "p1");

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // get_by_id(wrapper)
                .append_query_results([[wrapper]])
                // chain resolution: get_by_id(original)
                .append_query_results([[original.clone()]])
                // find_repost_by_user on the *original*
                .append_query_results([[existing.clone()]])
                // get_detail
                .append_query_results([[original]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "Alice")]])
                .append_query_results([[create_test_user("u3", "Carol")]])
                .into_connection(),
        );

        let service = service(post_db, user_db);

        let outcome = service.repost("u1", "r1").await.unwrap();
        assert_eq!(outcome.repost.repost_of_id.as_deref(), Some("p1"));
        assert_eq!(outcome.original.post.id, "p1");
    }

    #[tokio::test]
    async fn test_repost_creates_wrapper_and_increments() {
        let original = create_test_post("p1", "u2");
        let wrapper = create_test_repost("r1", "u1", "p1");
        let mut bumped = original.clone();
        bumped.repost_count = 1;

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // get_by_id(original)
                .append_query_results([[original.clone()]])
                // find_repost_by_user -> none
                .append_query_results([Vec::<post::Model>::new()])
                // insert returning
                .append_query_results([[wrapper.clone()]])
                // increment_repost_count
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                // get_detail: get_by_id (fresh) + no originals to hydrate
                .append_query_results([[bumped]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // reposted_by lookup
                .append_query_results([[create_test_user("u1", "Alice")]])
                // hydrate authors
                .append_query_results([[create_test_user("u2", "Bob")]])
                .into_connection(),
        );

        let service = service(post_db, user_db);

        let outcome = service.repost("u1", "p1").await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.repost.id, "r1");
        assert_eq!(outcome.original.post.repost_count, 1);
    }

    #[tokio::test]
    async fn test_feed_hydrates_authors_and_originals() {
        let original = create_test_post("p1", "u2");
        let wrapper = create_test_repost("r1", "u1", "p1");

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // find_feed
                .append_query_results([vec![wrapper, original.clone()]])
                // hydrate: find_by_ids(originals)
                .append_query_results([[original]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    create_test_user("u1", "Alice"),
                    create_test_user("u2", "Bob"),
                ]])
                .into_connection(),
        );

        let service = service(post_db, user_db);

        let feed = service.feed(20, None).await.unwrap();
        assert_eq!(feed.len(), 2);

        let wrapper_detail = &feed[0];
        assert!(wrapper_detail.repost_of.is_some());
        assert_eq!(
            wrapper_detail
                .repost_of
                .as_ref()
                .unwrap()
                .author
                .as_ref()
                .unwrap()
                .name,
            "Bob"
        );

        let plain = &feed[1];
        assert!(plain.repost_of.is_none());
        assert_eq!(plain.author.as_ref().unwrap().name, "Bob");
    }

    #[tokio::test]
    async fn test_search_blank_query_is_empty() {
        let service = service(empty_db(), empty_db());

        let result = service.search("   ", 20).await.unwrap();
        assert!(result.is_empty());
    }
}
