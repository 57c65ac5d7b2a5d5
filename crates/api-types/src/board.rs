use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use crate::{Card, Column, some_if_present};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "board_visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BoardVisibility {
    Public,
    Private,
    Workspace,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    /// Derived from the title at creation; not guaranteed globally unique.
    pub slug: String,
    pub description: Option<String>,
    pub visibility: BoardVisibility,
    pub owner_id: Uuid,
    pub workspace_id: Uuid,
    pub closed: bool,
    /// View over the board's columns. Entries with no matching column are
    /// tolerated by readers but never created by writers.
    pub column_order: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardMember {
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Per-user board flags, created alongside membership.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserBoardPreference {
    pub user_id: Uuid,
    pub board_id: Uuid,
    pub starred: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBoardRequest {
    pub title: String,
    pub description: Option<String>,
    pub visibility: BoardVisibility,
    pub workspace_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBoardRequest {
    #[serde(default, deserialize_with = "some_if_present")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "some_if_present")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeVisibilityRequest {
    pub visibility: BoardVisibility,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetColumnOrderRequest {
    pub column_order: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardMemberRequest {
    pub user_id: Uuid,
}

/// Full board view: the board row plus its columns and their cards.
#[derive(Debug, Clone, Serialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnWithCards>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnWithCards {
    #[serde(flatten)]
    pub column: Column,
    pub cards: Vec<Card>,
}
