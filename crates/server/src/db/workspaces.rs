use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use api_types::{Board, UserSummary, Workspace, WorkspaceDetail};

use super::LeaveOutcome;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("workspace not found")]
    NotFound,
    #[error("a workspace with this name already exists")]
    DuplicateName,
    #[error("user is already a member of this workspace")]
    AlreadyMember,
    #[error("user is not a member of this workspace")]
    NotMember,
}

const WORKSPACE_COLS: &str = "id, name, owner_id, created_at, updated_at";

pub struct WorkspaceRepository;

impl WorkspaceRepository {
    /// Creates the workspace and its owner membership row atomically. The
    /// name is unique case-insensitively across all workspaces.
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Workspace, WorkspaceError> {
        let mut tx = pool.begin().await?;

        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM workspaces WHERE lower(name) = lower($1)",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        if taken > 0 {
            return Err(WorkspaceError::DuplicateName);
        }

        let workspace = sqlx::query_as::<_, Workspace>(&format!(
            r#"
            INSERT INTO workspaces (id, name, owner_id)
            VALUES ($1, $2, $3)
            RETURNING {WORKSPACE_COLS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_member(&mut tx, workspace.id, owner_id).await?;
        tx.commit().await?;

        Ok(workspace)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Workspace, WorkspaceError> {
        sqlx::query_as::<_, Workspace>(&format!(
            "SELECT {WORKSPACE_COLS} FROM workspaces WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkspaceError::NotFound)
    }

    pub async fn detail(pool: &PgPool, id: Uuid) -> Result<WorkspaceDetail, WorkspaceError> {
        let workspace = Self::find_by_id(pool, id).await?;
        let members = Self::members(pool, id).await?;
        let boards = Self::boards(pool, id).await?;

        Ok(WorkspaceDetail {
            workspace,
            members,
            boards,
        })
    }

    /// Workspaces the user owns or belongs to, oldest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<WorkspaceDetail>, WorkspaceError> {
        let workspaces = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT w.id, w.name, w.owner_id, w.created_at, w.updated_at
            FROM workspaces w
            INNER JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.user_id = $1
            ORDER BY w.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut details = Vec::with_capacity(workspaces.len());
        for workspace in workspaces {
            let members = Self::members(pool, workspace.id).await?;
            let boards = Self::boards(pool, workspace.id).await?;
            details.push(WorkspaceDetail {
                workspace,
                members,
                boards,
            });
        }

        Ok(details)
    }

    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Workspace, WorkspaceError> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM workspaces WHERE lower(name) = lower($1) AND id <> $2",
        )
        .bind(name)
        .bind(id)
        .fetch_one(pool)
        .await?;
        if taken > 0 {
            return Err(WorkspaceError::DuplicateName);
        }

        sqlx::query_as::<_, Workspace>(&format!(
            r#"
            UPDATE workspaces
            SET name = $2, updated_at = now()
            WHERE id = $1
            RETURNING {WORKSPACE_COLS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkspaceError::NotFound)
    }

    pub async fn is_member(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, WorkspaceError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn add_member(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), WorkspaceError> {
        if Self::is_member(pool, workspace_id, user_id).await? {
            return Err(WorkspaceError::AlreadyMember);
        }

        let mut tx = pool.begin().await?;
        Self::insert_member(&mut tx, workspace_id, user_id).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn remove_member(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), WorkspaceError> {
        let result = sqlx::query(
            "DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkspaceError::NotMember);
        }
        Ok(())
    }

    /// Removes the member. When the owner leaves, ownership passes to the
    /// earliest remaining member; when the last member leaves, the workspace
    /// and everything under it is deleted.
    pub async fn leave(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<LeaveOutcome, WorkspaceError> {
        let mut tx = pool.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>(&format!(
            "SELECT {WORKSPACE_COLS} FROM workspaces WHERE id = $1 FOR UPDATE",
        ))
        .bind(workspace_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkspaceError::NotFound)?;

        let removed = sqlx::query(
            "DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        if removed.rows_affected() == 0 {
            return Err(WorkspaceError::NotMember);
        }

        let successor = if workspace.owner_id == user_id {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                SELECT user_id FROM workspace_members
                WHERE workspace_id = $1
                ORDER BY created_at
                LIMIT 1
                "#,
            )
            .bind(workspace_id)
            .fetch_optional(&mut *tx)
            .await?
        } else {
            None
        };

        let outcome = super::leave_outcome(workspace.owner_id, user_id, successor);
        match outcome {
            LeaveOutcome::OwnershipTransferred(next_owner) => {
                sqlx::query(
                    "UPDATE workspaces SET owner_id = $2, updated_at = now() WHERE id = $1",
                )
                .bind(workspace_id)
                .bind(next_owner)
                .execute(&mut *tx)
                .await?;
            }
            LeaveOutcome::Deleted => {
                sqlx::query("DELETE FROM workspaces WHERE id = $1")
                    .bind(workspace_id)
                    .execute(&mut *tx)
                    .await?;
            }
            LeaveOutcome::Left => {}
        }

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn members(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<UserSummary>, WorkspaceError> {
        let members = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.avatar
            FROM workspace_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.workspace_id = $1
            ORDER BY m.created_at
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn member_ids(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<Uuid>, WorkspaceError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM workspace_members WHERE workspace_id = $1 ORDER BY created_at",
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    async fn boards(pool: &PgPool, workspace_id: Uuid) -> Result<Vec<Board>, WorkspaceError> {
        let boards = sqlx::query_as::<_, Board>(
            r#"
            SELECT id, title, slug, description, visibility, owner_id, workspace_id,
                   closed, column_order, created_at, updated_at
            FROM boards
            WHERE workspace_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(boards)
    }

    async fn insert_member(
        tx: &mut Transaction<'_, Postgres>,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), WorkspaceError> {
        sqlx::query(
            r#"
            INSERT INTO workspace_members (workspace_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (workspace_id, user_id) DO NOTHING
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
