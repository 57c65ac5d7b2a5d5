use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use api_types::{Notification, NotificationType, NotificationWithActor};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("notification not found")]
    NotFound,
}

const RETURNING: &str =
    "id, notification_type, data, actor_id, target_user_id, is_read, created_at";

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn record(
        pool: &PgPool,
        notification_type: NotificationType,
        actor_id: Uuid,
        target_user_id: Uuid,
        data: Value,
    ) -> Result<Notification, NotificationError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (id, notification_type, data, actor_id, target_user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {RETURNING}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(notification_type)
        .bind(data)
        .bind(actor_id)
        .bind(target_user_id)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }

    /// One row per recipient, inserted in a single transaction.
    pub async fn record_many(
        pool: &PgPool,
        notification_type: NotificationType,
        actor_id: Uuid,
        target_user_ids: &[Uuid],
        data: Value,
    ) -> Result<(), NotificationError> {
        let mut tx = pool.begin().await?;
        for target in target_user_ids {
            sqlx::query(
                r#"
                INSERT INTO notifications (id, notification_type, data, actor_id, target_user_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(notification_type)
            .bind(&data)
            .bind(actor_id)
            .bind(target)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<NotificationWithActor>, NotificationError> {
        let notifications = sqlx::query_as::<_, NotificationWithActor>(
            r#"
            SELECT
                n.id, n.notification_type, n.data, n.actor_id,
                u.username AS actor_username, u.avatar AS actor_avatar,
                n.target_user_id, n.is_read, n.created_at
            FROM notifications n
            INNER JOIN users u ON u.id = n.actor_id
            WHERE n.target_user_id = $1
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, NotificationError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE target_user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Scoped to the recipient: marking someone else's notification is a
    /// not-found.
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), NotificationError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND target_user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }
}
