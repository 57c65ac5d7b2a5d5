use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChecklistRow {
    pub id: Uuid,
    pub card_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub checklist_id: Uuid,
    pub text: String,
    pub is_checked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    #[serde(flatten)]
    pub checklist: ChecklistRow,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChecklistRequest {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddChecklistItemRequest {
    pub text: String,
}
