use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use api_types::Invite;

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invite is invalid or has expired")]
    InvalidToken,
}

const INVITE_COLS: &str = "id, token, workspace_id, board_id, expires_at, created_at";

pub struct InviteRepository;

impl InviteRepository {
    /// Mints a new invite token for a workspace or a board. Tokens are
    /// multi-use until expiry.
    pub async fn create(
        pool: &PgPool,
        workspace_id: Option<Uuid>,
        board_id: Option<Uuid>,
        ttl_hours: i64,
    ) -> Result<Invite, InviteError> {
        let token = mint_token();
        let expires_at = Utc::now() + Duration::hours(ttl_hours);

        let invite = sqlx::query_as::<_, Invite>(&format!(
            r#"
            INSERT INTO invites (id, token, workspace_id, board_id, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {INVITE_COLS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&token)
        .bind(workspace_id)
        .bind(board_id)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(invite)
    }

    /// Resolves an unexpired invite by token. Expired or unknown tokens are
    /// indistinguishable to the caller.
    pub async fn verify(pool: &PgPool, token: &str) -> Result<Invite, InviteError> {
        sqlx::query_as::<_, Invite>(&format!(
            "SELECT {INVITE_COLS} FROM invites WHERE token = $1 AND expires_at > now()",
        ))
        .bind(token)
        .fetch_optional(pool)
        .await?
        .ok_or(InviteError::InvalidToken)
    }
}

fn mint_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let a = mint_token();
        let b = mint_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
