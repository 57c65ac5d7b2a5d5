use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Column {
    pub id: Uuid,
    pub title: String,
    pub board_id: Uuid,
    pub card_order: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateColumnRequest {
    pub title: String,
    pub board_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameColumnRequest {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetCardOrderRequest {
    pub card_order: Vec<Uuid>,
}

/// Drag-drop move of one card between two columns. The client supplies both
/// final order arrays; the server applies all three writes in one transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveCardRequest {
    pub card_id: Uuid,
    pub old_column_id: Uuid,
    pub new_column_id: Uuid,
    pub old_column_card_order: Vec<Uuid>,
    pub new_column_card_order: Vec<Uuid>,
}
