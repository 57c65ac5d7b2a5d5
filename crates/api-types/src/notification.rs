use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AddedToBoard,
    RemovedFromBoard,
    LeftBoard,
    AddedToWorkspace,
    RemovedFromWorkspace,
    LeftWorkspace,
    AddedToCard,
    RemovedFromCard,
    LeftCard,
    CardCompleted,
    CardUncompleted,
    TaggedInComment,
}

/// Durable per-recipient record of "actor did X". Only `is_read` ever changes
/// after insert.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub notification_type: NotificationType,
    /// Opaque context payload (entity ids, display names).
    pub data: Value,
    pub actor_id: Uuid,
    pub target_user_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationWithActor {
    pub id: Uuid,
    pub notification_type: NotificationType,
    pub data: Value,
    pub actor_id: Uuid,
    pub actor_username: String,
    pub actor_avatar: Option<String>,
    pub target_user_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

