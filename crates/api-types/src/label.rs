use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Label {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabelRequest {
    pub board_id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLabelRequest {
    pub name: String,
    pub color: String,
}

/// Outcome of toggling a label on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleLabelAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleLabelResponse {
    pub action: ToggleLabelAction,
}
