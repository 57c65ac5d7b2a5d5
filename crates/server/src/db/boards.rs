use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use api_types::{
    Board, BoardDetail, BoardVisibility, Card, Column, ColumnWithCards, UpdateBoardRequest,
    UserSummary,
};

use super::LeaveOutcome;
use crate::ordering::{self, ReorderError};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("board not found")]
    NotFound,
    #[error("invalid column order: {0}")]
    InvalidOrder(#[from] ReorderError),
    #[error("a board with this title already exists in the workspace")]
    DuplicateTitle,
    #[error("user is not a member of this board")]
    NotMember,
}

const BOARD_COLS: &str = "id, title, slug, description, visibility, owner_id, workspace_id, \
                          closed, column_order, created_at, updated_at";

pub struct BoardRepository;

impl BoardRepository {
    /// Creates the board with its owner membership and preference rows in one
    /// transaction.
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        workspace_id: Uuid,
        title: &str,
        slug: &str,
        description: Option<&str>,
        visibility: BoardVisibility,
    ) -> Result<Board, BoardError> {
        let mut tx = pool.begin().await?;

        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM boards WHERE workspace_id = $1 AND lower(title) = lower($2)",
        )
        .bind(workspace_id)
        .bind(title)
        .fetch_one(&mut *tx)
        .await?;
        if taken > 0 {
            return Err(BoardError::DuplicateTitle);
        }

        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            INSERT INTO boards (id, title, slug, description, visibility, owner_id, workspace_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BOARD_COLS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(visibility)
        .bind(owner_id)
        .bind(workspace_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_member(&mut tx, board.id, owner_id).await?;
        tx.commit().await?;

        Ok(board)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Board, BoardError> {
        sqlx::query_as::<_, Board>(&format!("SELECT {BOARD_COLS} FROM boards WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(BoardError::NotFound)
    }

    /// The full board view. Columns follow `column_order` and each column's
    /// cards follow its `card_order`; entries pointing at deleted children
    /// are skipped, children missing from an order array are appended.
    pub async fn detail(pool: &PgPool, id: Uuid) -> Result<BoardDetail, BoardError> {
        let board = Self::find_by_id(pool, id).await?;

        let columns = sqlx::query_as::<_, Column>(
            r#"
            SELECT id, board_id, title, card_order, created_at, updated_at
            FROM columns
            WHERE board_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let cards = sqlx::query_as::<_, Card>(
            r#"
            SELECT id, column_id, board_id, title, description, cover,
                   start_date, due_date, is_complete, created_at, updated_at
            FROM cards
            WHERE board_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let columns = ordering::order_view(&board.column_order, columns, |column| column.id)
            .into_iter()
            .map(|column| {
                let in_column: Vec<Card> = cards
                    .iter()
                    .filter(|card| card.column_id == column.id)
                    .cloned()
                    .collect();
                let cards = ordering::order_view(&column.card_order, in_column, |card| card.id);
                ColumnWithCards { column, cards }
            })
            .collect();

        Ok(BoardDetail { board, columns })
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: &UpdateBoardRequest,
    ) -> Result<Board, BoardError> {
        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards
            SET title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = now()
            WHERE id = $1
            RETURNING {BOARD_COLS}
            "#,
        ))
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.is_some())
        .bind(patch.description.as_ref().and_then(|d| d.as_deref()))
        .fetch_optional(pool)
        .await?
        .ok_or(BoardError::NotFound)?;

        Ok(board)
    }

    pub async fn set_closed(pool: &PgPool, id: Uuid, closed: bool) -> Result<Board, BoardError> {
        sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards
            SET closed = $2, updated_at = now()
            WHERE id = $1
            RETURNING {BOARD_COLS}
            "#,
        ))
        .bind(id)
        .bind(closed)
        .fetch_optional(pool)
        .await?
        .ok_or(BoardError::NotFound)
    }

    pub async fn set_visibility(
        pool: &PgPool,
        id: Uuid,
        visibility: BoardVisibility,
    ) -> Result<Board, BoardError> {
        sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards
            SET visibility = $2, updated_at = now()
            WHERE id = $1
            RETURNING {BOARD_COLS}
            "#,
        ))
        .bind(id)
        .bind(visibility)
        .fetch_optional(pool)
        .await?
        .ok_or(BoardError::NotFound)
    }

    /// Replaces `column_order`. The proposed order must be a permutation of
    /// the board's actual column ids; the check and the write share one
    /// transaction so a concurrent column insert cannot slip between them.
    pub async fn set_column_order(
        pool: &PgPool,
        id: Uuid,
        proposed: &[Uuid],
    ) -> Result<Board, BoardError> {
        let mut tx = pool.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM boards WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(BoardError::NotFound)?;

        let current = sqlx::query_scalar::<_, Uuid>("SELECT id FROM columns WHERE board_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        ordering::validate_reorder(&current, proposed)?;

        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards
            SET column_order = $2, updated_at = now()
            WHERE id = $1
            RETURNING {BOARD_COLS}
            "#,
        ))
        .bind(id)
        .bind(proposed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(board)
    }

    pub async fn is_member(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, BoardError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM board_members WHERE board_id = $1 AND user_id = $2",
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    /// Idempotent: adding an existing member changes nothing.
    pub async fn add_member(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), BoardError> {
        let mut tx = pool.begin().await?;
        Self::insert_member(&mut tx, board_id, user_id).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn remove_member(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), BoardError> {
        let result =
            sqlx::query("DELETE FROM board_members WHERE board_id = $1 AND user_id = $2")
                .bind(board_id)
                .bind(user_id)
                .execute(pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::NotMember);
        }
        Ok(())
    }

    /// Removes the member; transfers ownership to the earliest remaining
    /// member when the owner leaves, deletes the board when the last member
    /// leaves.
    pub async fn leave(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<LeaveOutcome, BoardError> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLS} FROM boards WHERE id = $1 FOR UPDATE",
        ))
        .bind(board_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BoardError::NotFound)?;

        let removed = sqlx::query("DELETE FROM board_members WHERE board_id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(BoardError::NotMember);
        }

        let successor = if board.owner_id == user_id {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                SELECT user_id FROM board_members
                WHERE board_id = $1
                ORDER BY created_at
                LIMIT 1
                "#,
            )
            .bind(board_id)
            .fetch_optional(&mut *tx)
            .await?
        } else {
            None
        };

        let outcome = super::leave_outcome(board.owner_id, user_id, successor);
        match outcome {
            LeaveOutcome::OwnershipTransferred(next_owner) => {
                sqlx::query("UPDATE boards SET owner_id = $2, updated_at = now() WHERE id = $1")
                    .bind(board_id)
                    .bind(next_owner)
                    .execute(&mut *tx)
                    .await?;
            }
            LeaveOutcome::Deleted => {
                sqlx::query("DELETE FROM boards WHERE id = $1")
                    .bind(board_id)
                    .execute(&mut *tx)
                    .await?;
            }
            LeaveOutcome::Left => {}
        }

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn members(pool: &PgPool, board_id: Uuid) -> Result<Vec<UserSummary>, BoardError> {
        let members = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.avatar
            FROM board_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.board_id = $1
            ORDER BY m.created_at
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn member_ids(pool: &PgPool, board_id: Uuid) -> Result<Vec<Uuid>, BoardError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM board_members WHERE board_id = $1 ORDER BY created_at",
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Flips the caller's starred flag and returns the new value.
    pub async fn toggle_starred(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, BoardError> {
        let starred = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE user_board_preferences
            SET starred = NOT starred
            WHERE board_id = $1 AND user_id = $2
            RETURNING starred
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(BoardError::NotMember)?;

        Ok(starred)
    }

    /// Boards the user has starred, across all their workspaces.
    pub async fn starred_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Board>, BoardError> {
        let boards = sqlx::query_as::<_, Board>(
            r#"
            SELECT b.id, b.title, b.slug, b.description, b.visibility, b.owner_id,
                   b.workspace_id, b.closed, b.column_order, b.created_at, b.updated_at
            FROM boards b
            INNER JOIN user_board_preferences p ON p.board_id = b.id
            WHERE p.user_id = $1 AND p.starred
            ORDER BY b.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(boards)
    }

    pub(super) async fn insert_member(
        tx: &mut Transaction<'_, Postgres>,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), BoardError> {
        sqlx::query(
            r#"
            INSERT INTO board_members (board_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (board_id, user_id) DO NOTHING
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_board_preferences (user_id, board_id)
            VALUES ($2, $1)
            ON CONFLICT (user_id, board_id) DO NOTHING
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
