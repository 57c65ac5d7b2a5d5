use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use api_types::{Column, MoveCardRequest};

use crate::ordering::{self, ReorderError};

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("column not found")]
    NotFound,
    #[error("card not found")]
    CardNotFound,
    #[error("a column with this title already exists on the board")]
    DuplicateTitle,
    #[error("invalid card order: {0}")]
    InvalidOrder(#[from] ReorderError),
    #[error("card does not belong to the source column")]
    WrongSourceColumn,
    #[error("columns belong to different boards")]
    CrossBoardMove,
}

const COLUMN_COLS: &str = "id, title, board_id, card_order, created_at, updated_at";

pub struct ColumnRepository;

impl ColumnRepository {
    /// Inserts the column and appends its id to the board's `column_order` in
    /// one transaction. The append is idempotent, so a retried request cannot
    /// produce a duplicate entry.
    pub async fn create(pool: &PgPool, board_id: Uuid, title: &str) -> Result<Column, ColumnError> {
        let mut tx = pool.begin().await?;

        let order = sqlx::query_scalar::<_, Vec<Uuid>>(
            "SELECT column_order FROM boards WHERE id = $1 FOR UPDATE",
        )
        .bind(board_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ColumnError::NotFound)?;

        Self::check_title(&mut *tx, board_id, title, None).await?;

        let column = sqlx::query_as::<_, Column>(&format!(
            r#"
            INSERT INTO columns (id, title, board_id)
            VALUES ($1, $2, $3)
            RETURNING {COLUMN_COLS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(board_id)
        .fetch_one(&mut *tx)
        .await?;

        let order = ordering::append_unique(&order, column.id);
        sqlx::query("UPDATE boards SET column_order = $2, updated_at = now() WHERE id = $1")
            .bind(board_id)
            .bind(&order)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(column)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Column, ColumnError> {
        sqlx::query_as::<_, Column>(&format!("SELECT {COLUMN_COLS} FROM columns WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ColumnError::NotFound)
    }

    /// Renames the column. Titles are unique case-insensitively within a
    /// board.
    pub async fn rename(pool: &PgPool, id: Uuid, title: &str) -> Result<Column, ColumnError> {
        let column = Self::find_by_id(pool, id).await?;
        Self::check_title(pool, column.board_id, title, Some(id)).await?;

        sqlx::query_as::<_, Column>(&format!(
            r#"
            UPDATE columns
            SET title = $2, updated_at = now()
            WHERE id = $1
            RETURNING {COLUMN_COLS}
            "#,
        ))
        .bind(id)
        .bind(title)
        .fetch_optional(pool)
        .await?
        .ok_or(ColumnError::NotFound)
    }

    /// Deletes the column (its cards cascade) and drops its id from the
    /// board's `column_order`.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Column, ColumnError> {
        let mut tx = pool.begin().await?;

        let column = sqlx::query_as::<_, Column>(&format!(
            "DELETE FROM columns WHERE id = $1 RETURNING {COLUMN_COLS}",
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ColumnError::NotFound)?;

        sqlx::query(
            r#"
            UPDATE boards
            SET column_order = array_remove(column_order, $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(column.board_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(column)
    }

    /// Replaces `card_order` within one column. The proposed order must be a
    /// permutation of the column's actual card ids.
    pub async fn set_card_order(
        pool: &PgPool,
        id: Uuid,
        proposed: &[Uuid],
    ) -> Result<Column, ColumnError> {
        let mut tx = pool.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM columns WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ColumnError::NotFound)?;

        let current = sqlx::query_scalar::<_, Uuid>("SELECT id FROM cards WHERE column_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        ordering::validate_reorder(&current, proposed)?;

        let column = sqlx::query_as::<_, Column>(&format!(
            r#"
            UPDATE columns
            SET card_order = $2, updated_at = now()
            WHERE id = $1
            RETURNING {COLUMN_COLS}
            "#,
        ))
        .bind(id)
        .bind(proposed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(column)
    }

    /// Moves one card between two columns of the same board: repoints the
    /// card and replaces both columns' `card_order` arrays, all in one
    /// transaction. Both proposed arrays are validated against the
    /// post-move card sets, so a reader never observes the card in both
    /// columns or in neither.
    pub async fn move_card(pool: &PgPool, request: &MoveCardRequest) -> Result<(), ColumnError> {
        let mut tx = pool.begin().await?;

        // Lock in a stable order to avoid deadlocking with a concurrent
        // move between the same pair.
        let (first, second) = if request.old_column_id < request.new_column_id {
            (request.old_column_id, request.new_column_id)
        } else {
            (request.new_column_id, request.old_column_id)
        };
        let mut boards = Vec::with_capacity(2);
        for column_id in [first, second] {
            let board_id = sqlx::query_scalar::<_, Uuid>(
                "SELECT board_id FROM columns WHERE id = $1 FOR UPDATE",
            )
            .bind(column_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ColumnError::NotFound)?;
            boards.push(board_id);
        }
        if boards[0] != boards[1] {
            return Err(ColumnError::CrossBoardMove);
        }

        let column_id = sqlx::query_scalar::<_, Uuid>("SELECT column_id FROM cards WHERE id = $1")
            .bind(request.card_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ColumnError::CardNotFound)?;
        if column_id != request.old_column_id {
            return Err(ColumnError::WrongSourceColumn);
        }

        sqlx::query("UPDATE cards SET column_id = $2, updated_at = now() WHERE id = $1")
            .bind(request.card_id)
            .bind(request.new_column_id)
            .execute(&mut *tx)
            .await?;

        for (column_id, proposed) in [
            (request.old_column_id, &request.old_column_card_order),
            (request.new_column_id, &request.new_column_card_order),
        ] {
            let current =
                sqlx::query_scalar::<_, Uuid>("SELECT id FROM cards WHERE column_id = $1")
                    .bind(column_id)
                    .fetch_all(&mut *tx)
                    .await?;
            ordering::validate_reorder(&current, proposed)?;

            sqlx::query("UPDATE columns SET card_order = $2, updated_at = now() WHERE id = $1")
                .bind(column_id)
                .bind(proposed)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn check_title<'e, E>(
        executor: E,
        board_id: Uuid,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ColumnError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let taken = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM columns
            WHERE board_id = $1 AND lower(title) = lower($2) AND ($3::uuid IS NULL OR id <> $3)
            "#,
        )
        .bind(board_id)
        .bind(title)
        .bind(exclude)
        .fetch_one(executor)
        .await?;

        if taken > 0 {
            return Err(ColumnError::DuplicateTitle);
        }
        Ok(())
    }
}
