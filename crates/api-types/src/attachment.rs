use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "attachment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    Local,
    Drive,
}

/// Metadata record for a file already stored elsewhere. Upload handling and
/// serving belong to the file-storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub attachment_type: AttachmentType,
    pub file_name: String,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddAttachmentsRequest {
    pub attachment_type: AttachmentType,
    pub files: Vec<AttachmentFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentFile {
    pub file_name: String,
    pub file_url: String,
}
