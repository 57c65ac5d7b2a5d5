use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use api_types::{User, UserSummary};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, avatar, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_summary(pool: &PgPool, id: Uuid) -> Result<Option<UserSummary>, UserError> {
        let user = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, avatar FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Substring search over username and email, for member pickers.
    pub async fn search(pool: &PgPool, query: &str) -> Result<Vec<UserSummary>, UserError> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, avatar
            FROM users
            WHERE username ILIKE $1 OR email ILIKE $1
            ORDER BY username
            LIMIT 20
            "#,
        )
        .bind(pattern)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}
