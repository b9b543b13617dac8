//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use ripple_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
    sea_query::{Expr, extension::postgres::PgExpr},
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find posts by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<post::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Post::find()
            .filter(post::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the feed (newest first, cursor-paginated).
    pub async fn find_feed(&self, limit: u64, until_id: Option<&str>) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .order_by_desc(post::Column::Id)
            .limit(limit);

        if let Some(until) = until_id {
            query = query.filter(post::Column::Id.lt(until));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an existing repost of `original_id` authored by `author_id`.
    ///
    /// This is the authoritative "already reposted" check, never derived
    /// from a feed projection.
    pub async fn find_repost_by_user(
        &self,
        author_id: &str,
        original_id: &str,
    ) -> AppResult<Option<post::Model>> {
        Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::RepostOfId.eq(original_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search posts by naive substring match on title or content.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<post::Model>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));

        Post::find()
            .filter(
                Condition::any()
                    .add(Expr::col(post::Column::Title).ilike(pattern.clone()))
                    .add(Expr::col(post::Column::Content).ilike(pattern)),
            )
            .order_by_desc(post::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment like count atomically (single UPDATE query, no fetch).
    pub async fn increment_like_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::LikeCount,
                Expr::col(post::Column::LikeCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement like count atomically (single UPDATE query, no fetch).
    pub async fn decrement_like_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::LikeCount,
                Expr::cust("GREATEST(like_count - 1, 0)"),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment comment count atomically (single UPDATE query, no fetch).
    pub async fn increment_comment_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::CommentCount,
                Expr::col(post::Column::CommentCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment repost count atomically (single UPDATE query, no fetch).
    pub async fn increment_repost_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::RepostCount,
                Expr::col(post::Column::RepostCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

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

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        match result {
            Err(AppError::PostNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected PostNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_repost_by_user_found() {
        let mut repost = create_test_post("p2", "u1");
        repost.repost_of_id = Some("p1".to_string());
        repost.content = None;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[repost]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_repost_by_user("u1", "p1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().repost_of_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_find_repost_by_user_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_repost_by_user("u1", "p1").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_increment_like_count_is_single_statement() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PostRepository::new(db.clone());
        repo.increment_like_count("p1").await.unwrap();
        drop(repo);

        // Exactly one statement, no preceding SELECT
        let conn = Arc::try_unwrap(db).unwrap();
        assert_eq!(conn.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn test_find_feed() {
        let p1 = create_test_post("p2", "u1");
        let p2 = create_test_post("p1", "u2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_feed(20, None).await.unwrap();

        assert_eq!(result.len(), 2);
    }
}
