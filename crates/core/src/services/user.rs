//! User service.

use campus_common::{AppError, AppResult};
use campus_db::entities::user;
use campus_db::repositories::UserRepository;

/// User service: identity lookups for the API layer.
///
/// Token issuing and verification mechanics belong to the external
/// authentication collaborator; this service only resolves an already
/// issued token to its user.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Get a user by ID.
    pub async fn get(&self, user_id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    /// Authenticate a user by access token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, token: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            name: None,
            avatar_url: None,
            token: Some(token.to_string()),
            is_suspended: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_authenticate_by_token_found() {
        let user = create_test_user("u1", "secret");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let result = service.authenticate_by_token("secret").await.unwrap();
        assert_eq!(result.id, "u1");
    }

    #[tokio::test]
    async fn test_authenticate_by_token_unknown_is_unauthorized() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let result = service.authenticate_by_token("bogus").await;
        match result {
            Err(AppError::Unauthorized) => {}
            other => panic!("Expected Unauthorized error, got {other:?}"),
        }
    }
}
