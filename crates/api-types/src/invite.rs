use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shareable invite link. Exactly one of `workspace_id` / `board_id` is
/// set. Valid for any number of redemptions until expiry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invite {
    pub id: Uuid,
    pub token: String,
    pub workspace_id: Option<Uuid>,
    pub board_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInviteRequest {
    pub workspace_id: Option<Uuid>,
    pub board_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateInviteResponse {
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyInviteResponse {
    pub workspace_id: Option<Uuid>,
    pub board_id: Option<Uuid>,
}
