//! Like repository.

use std::sync::Arc;

use crate::entities::{Like, like};
use ripple_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter,
};

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the unique like row for a (user, post) pair.
    pub async fn find_by_user_and_post(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> AppResult<Option<like::Model>> {
        Like::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user has liked a post.
    pub async fn has_liked(&self, user_id: &str, post_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_user_and_post(user_id, post_id)
            .await?
            .is_some())
    }

    /// Create a new like.
    pub async fn create(&self, model: like::ActiveModel) -> AppResult<like::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a like by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let like = Like::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if let Some(l) = like {
            l.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Hard-delete the like row for a (user, post) pair.
    pub async fn delete_by_user_and_post(&self, user_id: &str, post_id: &str) -> AppResult<()> {
        let like = self.find_by_user_and_post(user_id, post_id).await?;
        if let Some(l) = like {
            l.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Count likes on a post.
    pub async fn count_by_post(&self, post_id: &str) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the ids of posts a user has liked.
    pub async fn find_post_ids_by_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        let likes = Like::find()
            .filter(like::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(likes.into_iter().map(|l| l.post_id).collect())
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_like(id: &str, user_id: &str, post_id: &str) -> like::Model {
        like::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_has_liked_true() {
        let like = create_test_like("l1", "u1", "p1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[like]])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        assert!(repo.has_liked("u1", "p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_has_liked_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<like::Model>::new()])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        assert!(!repo.has_liked("u1", "p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_like_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<like::Model>::new()])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        // No matching row: nothing to delete, no error
        repo.delete_by_user_and_post("u1", "p1").await.unwrap();
    }

    #[tokio::test]
    async fn test_find_post_ids_by_user() {
        let l1 = create_test_like("l1", "u1", "p1");
        let l2 = create_test_like("l2", "u1", "p3");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[l1, l2]])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        let ids = repo.find_post_ids_by_user("u1").await.unwrap();

        assert_eq!(ids, vec!["p1".to_string(), "p3".to_string()]);
    }

}
