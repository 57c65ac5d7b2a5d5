use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::{
    boards::BoardError, cards::CardError, columns::ColumnError, invites::InviteError,
    labels::LabelError, notifications::NotificationError, users::UserError,
    workspaces::WorkspaceError,
};
use crate::ordering::ReorderError;

/// Route-level error. Every variant maps to one status code and a
/// `{"success": false, "message": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<WorkspaceError> for ApiError {
    fn from(error: WorkspaceError) -> Self {
        match error {
            WorkspaceError::Database(e) => ApiError::Database(e),
            WorkspaceError::NotFound => ApiError::NotFound(error.to_string()),
            WorkspaceError::DuplicateName => ApiError::Conflict(error.to_string()),
            WorkspaceError::AlreadyMember => ApiError::Conflict(error.to_string()),
            WorkspaceError::NotMember => ApiError::NotFound(error.to_string()),
        }
    }
}

impl From<BoardError> for ApiError {
    fn from(error: BoardError) -> Self {
        match error {
            BoardError::Database(e) => ApiError::Database(e),
            BoardError::NotFound => ApiError::NotFound(error.to_string()),
            BoardError::InvalidOrder(e) => ApiError::Validation(e.to_string()),
            BoardError::DuplicateTitle => ApiError::Conflict(error.to_string()),
            BoardError::NotMember => ApiError::NotFound(error.to_string()),
        }
    }
}

impl From<ColumnError> for ApiError {
    fn from(error: ColumnError) -> Self {
        match error {
            ColumnError::Database(e) => ApiError::Database(e),
            ColumnError::NotFound | ColumnError::CardNotFound => {
                ApiError::NotFound(error.to_string())
            }
            ColumnError::DuplicateTitle => ApiError::Conflict(error.to_string()),
            ColumnError::InvalidOrder(e) => ApiError::Validation(e.to_string()),
            ColumnError::WrongSourceColumn | ColumnError::CrossBoardMove => {
                ApiError::Validation(error.to_string())
            }
        }
    }
}

impl From<CardError> for ApiError {
    fn from(error: CardError) -> Self {
        match error {
            CardError::Database(e) => ApiError::Database(e),
            CardError::NotFound
            | CardError::ColumnNotFound
            | CardError::CommentNotFound
            | CardError::ChecklistNotFound
            | CardError::ChecklistItemNotFound
            | CardError::NotMember => ApiError::NotFound(error.to_string()),
            CardError::DuplicateChecklistTitle => ApiError::Conflict(error.to_string()),
            CardError::Board(e) => e.into(),
        }
    }
}

impl From<LabelError> for ApiError {
    fn from(error: LabelError) -> Self {
        match error {
            LabelError::Database(e) => ApiError::Database(e),
            LabelError::NotFound => ApiError::NotFound(error.to_string()),
        }
    }
}

impl From<InviteError> for ApiError {
    fn from(error: InviteError) -> Self {
        match error {
            InviteError::Database(e) => ApiError::Database(e),
            InviteError::InvalidToken => ApiError::NotFound(error.to_string()),
        }
    }
}

impl From<NotificationError> for ApiError {
    fn from(error: NotificationError) -> Self {
        match error {
            NotificationError::Database(e) => ApiError::Database(e),
            NotificationError::NotFound => ApiError::NotFound(error.to_string()),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::Database(e) => ApiError::Database(e),
        }
    }
}

impl From<ReorderError> for ApiError {
    fn from(error: ReorderError) -> Self {
        ApiError::Validation(error.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::Database(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        assert_eq!(
            ApiError::from(WorkspaceError::DuplicateName).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(BoardError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ColumnError::WrongSourceColumn).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(InviteError::InvalidToken).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn reorder_violations_are_client_errors() {
        let error = ApiError::from(ReorderError::DuplicateId(uuid::Uuid::new_v4()));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }
}
