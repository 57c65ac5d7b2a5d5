use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use api_types::{Label, ToggleLabelAction};

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("label not found")]
    NotFound,
}

const LABEL_COLS: &str = "id, board_id, name, color, created_at";

pub struct LabelRepository;

impl LabelRepository {
    pub async fn create(
        pool: &PgPool,
        board_id: Uuid,
        name: &str,
        color: &str,
    ) -> Result<Label, LabelError> {
        let label = sqlx::query_as::<_, Label>(&format!(
            r#"
            INSERT INTO labels (id, board_id, name, color)
            VALUES ($1, $2, $3, $4)
            RETURNING {LABEL_COLS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(board_id)
        .bind(name)
        .bind(color)
        .fetch_one(pool)
        .await?;

        Ok(label)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Label, LabelError> {
        sqlx::query_as::<_, Label>(&format!("SELECT {LABEL_COLS} FROM labels WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(LabelError::NotFound)
    }

    pub async fn list_for_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Label>, LabelError> {
        let labels = sqlx::query_as::<_, Label>(&format!(
            "SELECT {LABEL_COLS} FROM labels WHERE board_id = $1 ORDER BY created_at",
        ))
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(labels)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        name: &str,
        color: &str,
    ) -> Result<Label, LabelError> {
        sqlx::query_as::<_, Label>(&format!(
            r#"
            UPDATE labels
            SET name = $2, color = $3
            WHERE id = $1
            RETURNING {LABEL_COLS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(color)
        .fetch_optional(pool)
        .await?
        .ok_or(LabelError::NotFound)
    }

    /// Deletes the label; `card_labels` rows cascade.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Label, LabelError> {
        sqlx::query_as::<_, Label>(&format!(
            "DELETE FROM labels WHERE id = $1 RETURNING {LABEL_COLS}",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(LabelError::NotFound)
    }

    /// Attaches the label to the card, or detaches it if already attached.
    pub async fn toggle_on_card(
        pool: &PgPool,
        label_id: Uuid,
        card_id: Uuid,
    ) -> Result<ToggleLabelAction, LabelError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO card_labels (card_id, label_id)
            VALUES ($1, $2)
            ON CONFLICT (card_id, label_id) DO NOTHING
            "#,
        )
        .bind(card_id)
        .bind(label_id)
        .execute(pool)
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(ToggleLabelAction::Added);
        }

        sqlx::query("DELETE FROM card_labels WHERE card_id = $1 AND label_id = $2")
            .bind(card_id)
            .bind(label_id)
            .execute(pool)
            .await?;
        Ok(ToggleLabelAction::Removed)
    }
}
