//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use ripple_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get notifications for a user (newest first, paginated).
    pub async fn find_by_recipient(
        &self,
        recipient_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .order_by_desc(notification::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(notification::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark the given notifications as read, scoped to the recipient.
    ///
    /// Ids that do not exist, are already read, or belong to another user
    /// are left untouched; the call is idempotent.
    pub async fn mark_many_as_read(&self, recipient_id: &str, ids: &[String]) -> AppResult<u64> {
        use sea_orm::UpdateResult;

        if ids.is_empty() {
            return Ok(0);
        }

        let result: UpdateResult = Notification::update_many()
            .filter(notification::Column::Id.is_in(ids.to_vec()))
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .col_expr(notification::Column::IsRead, true.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, recipient_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_notification(id: &str, recipient_id: &str, sender_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient_id.to_string(),
            sender_id: sender_id.to_string(),
            notification_type: NotificationType::Like,
            content: "Alice liked your post".to_string(),
            post_id: Some("p1".to_string()),
            comment_id: None,
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_recipient() {
        let n1 = create_test_notification("n2", "u1", "u2");
        let n2 = create_test_notification("n1", "u1", "u3");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n1, n2]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo.find_by_recipient("u1", 50, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "n2");
    }

    #[tokio::test]
    async fn test_mark_many_as_read_empty_shortcut() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = NotificationRepository::new(db);
        let affected = repo.mark_many_as_read("u1", &[]).await.unwrap();

        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_mark_many_as_read_reports_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let affected = repo
            .mark_many_as_read("u1", &["n1".to_string(), "n2".to_string()])
            .await
            .unwrap();

        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_count_unread() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let count = repo.count_unread("u1").await.unwrap();

        assert_eq!(count, 3);
    }
}
