use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    CardCreated,
    JoinedCard,
    LeftCard,
    AddMember,
    CompleteCard,
    IncompleteCard,
    UploadAttachment,
}

/// Card-scoped audit entry, append-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}
