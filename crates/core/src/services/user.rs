//! User service.
//!
//! The session/identity system is an external collaborator; this service is
//! the thin seam it reaches us through: a bearer token either resolves to a
//! user row or the request is unauthenticated.

use chrono::Utc;
use ripple_common::{AppError, AppResult, IdGenerator};
use ripple_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve a bearer token to a user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_api_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Register a new user with a fresh API token.
    pub async fn register(&self, name: &str, image: Option<&str>) -> AppResult<user::Model> {
        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            image: Set(image.map(std::string::ToString::to_string)),
            api_token: Set(self.id_gen.generate_token()),
            created_at: Set(Utc::now().into()),
        };

        self.user_repo.create(model).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_authenticate_unknown_token_is_unauthorized() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = UserService::new(UserRepository::new(db));
        let result = service.authenticate_by_token("bogus").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_known_token() {
        let user = user::Model {
            id: "u1".to_string(),
            name: "Alice".to_string(),
            image: None,
            api_token: "token-u1".to_string(),
            created_at: chrono::Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let service = UserService::new(UserRepository::new(db));
        let result = service.authenticate_by_token("token-u1").await.unwrap();

        assert_eq!(result.id, "u1");
    }
}
