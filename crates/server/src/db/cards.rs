use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use api_types::{
    Activity, ActivityAction, Attachment, AttachmentFile, AttachmentType, Card, CardDetail,
    Checklist, ChecklistItem, ChecklistRow, Comment, CommentWithAuthor, Label, UpdateCardRequest,
    UserSummary,
};

use super::boards::{BoardError, BoardRepository};
use crate::ordering;

#[derive(Debug, Error)]
pub enum CardError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("card not found")]
    NotFound,
    #[error("column not found")]
    ColumnNotFound,
    #[error("comment not found")]
    CommentNotFound,
    #[error("checklist not found")]
    ChecklistNotFound,
    #[error("checklist item not found")]
    ChecklistItemNotFound,
    #[error("a checklist with this title already exists on the card")]
    DuplicateChecklistTitle,
    #[error("user is not a member of this card")]
    NotMember,
    #[error(transparent)]
    Board(#[from] BoardError),
}

const CARD_COLS: &str = "id, title, column_id, board_id, description, cover, start_date, \
                         due_date, is_complete, created_at, updated_at";

pub struct CardRepository;

impl CardRepository {
    /// Inserts the card, appends its id to the column's `card_order` and
    /// writes the creation activity, all in one transaction.
    pub async fn create(
        pool: &PgPool,
        actor_id: Uuid,
        column_id: Uuid,
        board_id: Uuid,
        title: &str,
    ) -> Result<Card, CardError> {
        let mut tx = pool.begin().await?;

        let (order, column_title) = sqlx::query_as::<_, (Vec<Uuid>, String)>(
            "SELECT card_order, title FROM columns WHERE id = $1 AND board_id = $2 FOR UPDATE",
        )
        .bind(column_id)
        .bind(board_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CardError::ColumnNotFound)?;

        let card = sqlx::query_as::<_, Card>(&format!(
            r#"
            INSERT INTO cards (id, title, column_id, board_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {CARD_COLS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(column_id)
        .bind(board_id)
        .fetch_one(&mut *tx)
        .await?;

        let order = ordering::append_unique(&order, card.id);
        sqlx::query("UPDATE columns SET card_order = $2, updated_at = now() WHERE id = $1")
            .bind(column_id)
            .bind(&order)
            .execute(&mut *tx)
            .await?;

        Self::insert_activity(
            &mut tx,
            card.id,
            actor_id,
            ActivityAction::CardCreated,
            json!({ "columnTitle": column_title }),
        )
        .await?;

        tx.commit().await?;
        Ok(card)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Card, CardError> {
        sqlx::query_as::<_, Card>(&format!("SELECT {CARD_COLS} FROM cards WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(CardError::NotFound)
    }

    pub async fn detail(pool: &PgPool, id: Uuid) -> Result<CardDetail, CardError> {
        let card = Self::find_by_id(pool, id).await?;

        let labels = sqlx::query_as::<_, Label>(
            r#"
            SELECT l.id, l.board_id, l.name, l.color, l.created_at
            FROM card_labels cl
            INNER JOIN labels l ON l.id = cl.label_id
            WHERE cl.card_id = $1
            ORDER BY l.created_at
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let checklists = Self::checklists(pool, id).await?;
        let members = Self::members(pool, id).await?;
        let comments = Self::comments(pool, id).await?;

        let attachments = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, card_id, user_id, attachment_type, file_name, file_url, created_at
            FROM attachments
            WHERE card_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let activity = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, card_id, user_id, action, data, created_at
            FROM activities
            WHERE card_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(CardDetail {
            card,
            labels,
            checklists,
            members,
            comments,
            attachments,
            activity,
        })
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: &UpdateCardRequest,
    ) -> Result<Card, CardError> {
        let card = sqlx::query_as::<_, Card>(&format!(
            r#"
            UPDATE cards
            SET title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                cover = CASE WHEN $5 THEN $6 ELSE cover END,
                updated_at = now()
            WHERE id = $1
            RETURNING {CARD_COLS}
            "#,
        ))
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.is_some())
        .bind(patch.description.as_ref().and_then(|d| d.as_deref()))
        .bind(patch.cover.is_some())
        .bind(patch.cover.as_ref().and_then(|c| c.as_deref()))
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::NotFound)?;

        Ok(card)
    }

    pub async fn set_dates(
        pool: &PgPool,
        id: Uuid,
        start_date: Option<DateTime<Utc>>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Card, CardError> {
        sqlx::query_as::<_, Card>(&format!(
            r#"
            UPDATE cards
            SET start_date = $2, due_date = $3, updated_at = now()
            WHERE id = $1
            RETURNING {CARD_COLS}
            "#,
        ))
        .bind(id)
        .bind(start_date)
        .bind(due_date)
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::NotFound)
    }

    /// Flips completion and writes the matching activity entry.
    pub async fn set_complete(
        pool: &PgPool,
        id: Uuid,
        actor_id: Uuid,
        is_complete: bool,
    ) -> Result<Card, CardError> {
        let mut tx = pool.begin().await?;

        let card = sqlx::query_as::<_, Card>(&format!(
            r#"
            UPDATE cards
            SET is_complete = $2, updated_at = now()
            WHERE id = $1
            RETURNING {CARD_COLS}
            "#,
        ))
        .bind(id)
        .bind(is_complete)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CardError::NotFound)?;

        let action = if is_complete {
            ActivityAction::CompleteCard
        } else {
            ActivityAction::IncompleteCard
        };
        Self::insert_activity(&mut tx, id, actor_id, action, json!({})).await?;

        tx.commit().await?;
        Ok(card)
    }

    /// Deletes the card and drops its id from the owning column's
    /// `card_order`.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Card, CardError> {
        let mut tx = pool.begin().await?;

        let card = sqlx::query_as::<_, Card>(&format!(
            "DELETE FROM cards WHERE id = $1 RETURNING {CARD_COLS}",
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CardError::NotFound)?;

        sqlx::query(
            r#"
            UPDATE columns
            SET card_order = array_remove(card_order, $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(card.column_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(card)
    }

    pub async fn is_member(pool: &PgPool, card_id: Uuid, user_id: Uuid) -> Result<bool, CardError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM card_members WHERE card_id = $1 AND user_id = $2",
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    /// Adds a card member, pulling them onto the board as well when they are
    /// not already on it. Idempotent at both levels. Records the activity
    /// under the actor: `JoinedCard` for self-joins, `AddMember` otherwise.
    pub async fn add_member(
        pool: &PgPool,
        card_id: Uuid,
        board_id: Uuid,
        actor_id: Uuid,
        user_id: Uuid,
        username: &str,
    ) -> Result<(), CardError> {
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO card_members (card_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (card_id, user_id) DO NOTHING
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        BoardRepository::insert_member(&mut tx, board_id, user_id).await?;

        if inserted.rows_affected() > 0 {
            let (action, data) = if actor_id == user_id {
                (ActivityAction::JoinedCard, json!({}))
            } else {
                (ActivityAction::AddMember, json!({ "memberName": username }))
            };
            Self::insert_activity(&mut tx, card_id, actor_id, action, data).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_member(
        pool: &PgPool,
        card_id: Uuid,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), CardError> {
        let mut tx = pool.begin().await?;

        let removed = sqlx::query("DELETE FROM card_members WHERE card_id = $1 AND user_id = $2")
            .bind(card_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(CardError::NotMember);
        }

        if actor_id == user_id {
            Self::insert_activity(&mut tx, card_id, actor_id, ActivityAction::LeftCard, json!({}))
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn members(pool: &PgPool, card_id: Uuid) -> Result<Vec<UserSummary>, CardError> {
        let members = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.avatar
            FROM card_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.card_id = $1
            ORDER BY m.created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn member_ids(pool: &PgPool, card_id: Uuid) -> Result<Vec<Uuid>, CardError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM card_members WHERE card_id = $1 ORDER BY created_at",
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    pub async fn add_comment(
        pool: &PgPool,
        card_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<CommentWithAuthor, CardError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, card_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, card_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(card_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(pool)
        .await?;

        Self::comment_with_author(pool, comment.id).await
    }

    /// Only the author may edit; enforced by the id+user predicate.
    pub async fn update_comment(
        pool: &PgPool,
        comment_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<CommentWithAuthor, CardError> {
        let result = sqlx::query(
            "UPDATE comments SET content = $3, updated_at = now() WHERE id = $1 AND user_id = $2",
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(content)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CardError::CommentNotFound);
        }
        Self::comment_with_author(pool, comment_id).await
    }

    pub async fn delete_comment(
        pool: &PgPool,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Comment, CardError> {
        sqlx::query_as::<_, Comment>(
            r#"
            DELETE FROM comments WHERE id = $1 AND user_id = $2
            RETURNING id, card_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::CommentNotFound)
    }

    pub async fn comments(
        pool: &PgPool,
        card_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, CardError> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.card_id, c.user_id, c.content,
                   u.username, u.avatar, c.created_at, c.updated_at
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.card_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Checklist titles are unique case-insensitively within a card.
    pub async fn create_checklist(
        pool: &PgPool,
        card_id: Uuid,
        title: &str,
    ) -> Result<ChecklistRow, CardError> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM checklists WHERE card_id = $1 AND lower(title) = lower($2)",
        )
        .bind(card_id)
        .bind(title)
        .fetch_one(pool)
        .await?;
        if taken > 0 {
            return Err(CardError::DuplicateChecklistTitle);
        }

        let checklist = sqlx::query_as::<_, ChecklistRow>(
            r#"
            INSERT INTO checklists (id, card_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, card_id, title, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(card_id)
        .bind(title)
        .fetch_one(pool)
        .await?;

        Ok(checklist)
    }

    pub async fn delete_checklist(pool: &PgPool, checklist_id: Uuid) -> Result<Uuid, CardError> {
        let card_id =
            sqlx::query_scalar::<_, Uuid>("DELETE FROM checklists WHERE id = $1 RETURNING card_id")
                .bind(checklist_id)
                .fetch_optional(pool)
                .await?
                .ok_or(CardError::ChecklistNotFound)?;

        Ok(card_id)
    }

    pub async fn add_checklist_item(
        pool: &PgPool,
        checklist_id: Uuid,
        text: &str,
    ) -> Result<ChecklistItem, CardError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM checklists WHERE id = $1")
            .bind(checklist_id)
            .fetch_one(pool)
            .await?;
        if exists == 0 {
            return Err(CardError::ChecklistNotFound);
        }

        let item = sqlx::query_as::<_, ChecklistItem>(
            r#"
            INSERT INTO checklist_items (id, checklist_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, checklist_id, text, is_checked, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(checklist_id)
        .bind(text)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    pub async fn toggle_checklist_item(
        pool: &PgPool,
        item_id: Uuid,
    ) -> Result<ChecklistItem, CardError> {
        sqlx::query_as::<_, ChecklistItem>(
            r#"
            UPDATE checklist_items
            SET is_checked = NOT is_checked
            WHERE id = $1
            RETURNING id, checklist_id, text, is_checked, created_at
            "#,
        )
        .bind(item_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::ChecklistItemNotFound)
    }

    pub async fn delete_checklist_item(pool: &PgPool, item_id: Uuid) -> Result<(), CardError> {
        let result = sqlx::query("DELETE FROM checklist_items WHERE id = $1")
            .bind(item_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CardError::ChecklistItemNotFound);
        }
        Ok(())
    }

    pub async fn checklists(pool: &PgPool, card_id: Uuid) -> Result<Vec<Checklist>, CardError> {
        let rows = sqlx::query_as::<_, ChecklistRow>(
            r#"
            SELECT id, card_id, title, created_at
            FROM checklists
            WHERE card_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        let items = sqlx::query_as::<_, ChecklistItem>(
            r#"
            SELECT i.id, i.checklist_id, i.text, i.is_checked, i.created_at
            FROM checklist_items i
            INNER JOIN checklists c ON c.id = i.checklist_id
            WHERE c.card_id = $1
            ORDER BY i.created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|checklist| {
                let items = items
                    .iter()
                    .filter(|item| item.checklist_id == checklist.id)
                    .cloned()
                    .collect();
                Checklist { checklist, items }
            })
            .collect())
    }

    /// Records the attachment metadata rows and one upload activity per
    /// file, in a single transaction.
    pub async fn add_attachments(
        pool: &PgPool,
        card_id: Uuid,
        user_id: Uuid,
        attachment_type: AttachmentType,
        files: &[AttachmentFile],
    ) -> Result<Vec<Attachment>, CardError> {
        let mut tx = pool.begin().await?;

        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            let attachment = sqlx::query_as::<_, Attachment>(
                r#"
                INSERT INTO attachments (id, card_id, user_id, attachment_type, file_name, file_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, card_id, user_id, attachment_type, file_name, file_url, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(card_id)
            .bind(user_id)
            .bind(attachment_type)
            .bind(&file.file_name)
            .bind(&file.file_url)
            .fetch_one(&mut *tx)
            .await?;

            Self::insert_activity(
                &mut tx,
                card_id,
                user_id,
                ActivityAction::UploadAttachment,
                json!({ "fileName": attachment.file_name }),
            )
            .await?;
            attachments.push(attachment);
        }

        tx.commit().await?;
        Ok(attachments)
    }

    pub async fn record_activity(
        pool: &PgPool,
        card_id: Uuid,
        user_id: Uuid,
        action: ActivityAction,
        data: Value,
    ) -> Result<(), CardError> {
        let mut tx = pool.begin().await?;
        Self::insert_activity(&mut tx, card_id, user_id, action, data).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn find_comment(pool: &PgPool, comment_id: Uuid) -> Result<Comment, CardError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, card_id, user_id, content, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::CommentNotFound)
    }

    pub async fn card_for_checklist(pool: &PgPool, checklist_id: Uuid) -> Result<Card, CardError> {
        sqlx::query_as::<_, Card>(
            r#"
            SELECT ca.id, ca.title, ca.column_id, ca.board_id, ca.description, ca.cover,
                   ca.start_date, ca.due_date, ca.is_complete, ca.created_at, ca.updated_at
            FROM checklists ch
            INNER JOIN cards ca ON ca.id = ch.card_id
            WHERE ch.id = $1
            "#,
        )
        .bind(checklist_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::ChecklistNotFound)
    }

    pub async fn card_for_checklist_item(pool: &PgPool, item_id: Uuid) -> Result<Card, CardError> {
        sqlx::query_as::<_, Card>(
            r#"
            SELECT ca.id, ca.title, ca.column_id, ca.board_id, ca.description, ca.cover,
                   ca.start_date, ca.due_date, ca.is_complete, ca.created_at, ca.updated_at
            FROM checklist_items i
            INNER JOIN checklists ch ON ch.id = i.checklist_id
            INNER JOIN cards ca ON ca.id = ch.card_id
            WHERE i.id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::ChecklistItemNotFound)
    }

    async fn comment_with_author(
        pool: &PgPool,
        comment_id: Uuid,
    ) -> Result<CommentWithAuthor, CardError> {
        sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.card_id, c.user_id, c.content,
                   u.username, u.avatar, c.created_at, c.updated_at
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.id = $1
            "#,
        )
        .bind(comment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CardError::CommentNotFound)
    }

    async fn insert_activity(
        tx: &mut Transaction<'_, Postgres>,
        card_id: Uuid,
        user_id: Uuid,
        action: ActivityAction,
        data: Value,
    ) -> Result<(), CardError> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, card_id, user_id, action, data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(card_id)
        .bind(user_id)
        .bind(action)
        .bind(data)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
