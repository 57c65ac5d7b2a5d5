use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Activity, Attachment, Checklist, CommentWithAuthor, Label, UserSummary, some_if_present};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: Uuid,
    pub title: String,
    pub column_id: Uuid,
    /// Derived copy of the owning board's id, maintained transactionally with
    /// `column_id`. Used for access checks and broadcast routing; never
    /// authoritative on its own.
    pub board_id: Uuid,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardMember {
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    pub column_id: Uuid,
    pub board_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCardRequest {
    #[serde(default, deserialize_with = "some_if_present")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "some_if_present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "some_if_present")]
    pub cover: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetCardDatesRequest {
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteCardRequest {
    pub is_complete: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardMemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardDetail {
    #[serde(flatten)]
    pub card: Card,
    pub labels: Vec<Label>,
    pub checklists: Vec<Checklist>,
    pub members: Vec<UserSummary>,
    pub comments: Vec<CommentWithAuthor>,
    pub attachments: Vec<Attachment>,
    pub activity: Vec<Activity>,
}
