//! Authorization checks shared by the route handlers. Membership and
//! ownership are looked up per request; the pure visibility rule lives in
//! [`visibility_allows`] so it can be tested without a database.

use uuid::Uuid;

use api_types::{Board, BoardVisibility, Workspace};

use crate::AppState;
use crate::db::{boards::BoardRepository, workspaces::WorkspaceRepository};
use crate::routes::error::ApiError;

/// The membership facts that feed the board visibility rule.
#[derive(Debug, Clone, Copy)]
pub struct Membership {
    pub board_member: bool,
    pub workspace_member: bool,
}

/// Whether a user with the given memberships may view a board.
///
/// Public boards are open to any authenticated user. Private boards require
/// board membership. Workspace boards accept board members and members of
/// the owning workspace.
pub fn visibility_allows(visibility: BoardVisibility, membership: Membership) -> bool {
    match visibility {
        BoardVisibility::Public => true,
        BoardVisibility::Private => membership.board_member,
        BoardVisibility::Workspace => membership.board_member || membership.workspace_member,
    }
}

/// Loads the board and rejects with 403 unless the user may view it.
pub async fn ensure_board_view(
    state: &AppState,
    board_id: Uuid,
    user_id: Uuid,
) -> Result<Board, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), board_id).await?;

    let membership = Membership {
        board_member: BoardRepository::is_member(state.pool(), board_id, user_id).await?,
        workspace_member: WorkspaceRepository::is_member(
            state.pool(),
            board.workspace_id,
            user_id,
        )
        .await?,
    };
    if !visibility_allows(board.visibility, membership) {
        return Err(ApiError::Forbidden(
            "you do not have access to this board".to_string(),
        ));
    }

    Ok(board)
}

/// Loads the board and rejects with 403 unless the user is a board member.
/// Mutations require membership regardless of visibility.
pub async fn ensure_board_member(
    state: &AppState,
    board_id: Uuid,
    user_id: Uuid,
) -> Result<Board, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), board_id).await?;
    if !BoardRepository::is_member(state.pool(), board_id, user_id).await? {
        return Err(ApiError::Forbidden(
            "only board members can do this".to_string(),
        ));
    }

    Ok(board)
}

/// Loads the board and rejects with 403 unless the user owns it.
pub async fn ensure_board_owner(
    state: &AppState,
    board_id: Uuid,
    user_id: Uuid,
) -> Result<Board, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), board_id).await?;
    if board.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "only the board owner can do this".to_string(),
        ));
    }

    Ok(board)
}

/// Loads the workspace and rejects with 403 unless the user is a member.
pub async fn ensure_workspace_member(
    state: &AppState,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Workspace, ApiError> {
    let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id).await?;
    if !WorkspaceRepository::is_member(state.pool(), workspace_id, user_id).await? {
        return Err(ApiError::Forbidden(
            "only workspace members can do this".to_string(),
        ));
    }

    Ok(workspace)
}

/// Loads the workspace and rejects with 403 unless the user owns it.
pub async fn ensure_workspace_owner(
    state: &AppState,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Workspace, ApiError> {
    let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id).await?;
    if workspace.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "only the workspace owner can do this".to_string(),
        ));
    }

    Ok(workspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOBODY: Membership = Membership {
        board_member: false,
        workspace_member: false,
    };
    const BOARD_MEMBER: Membership = Membership {
        board_member: true,
        workspace_member: false,
    };
    const WORKSPACE_MEMBER: Membership = Membership {
        board_member: false,
        workspace_member: true,
    };

    #[test]
    fn public_boards_are_open_to_everyone() {
        assert!(visibility_allows(BoardVisibility::Public, NOBODY));
    }

    #[test]
    fn private_boards_require_board_membership() {
        assert!(visibility_allows(BoardVisibility::Private, BOARD_MEMBER));
        assert!(!visibility_allows(
            BoardVisibility::Private,
            WORKSPACE_MEMBER
        ));
        assert!(!visibility_allows(BoardVisibility::Private, NOBODY));
    }

    #[test]
    fn workspace_boards_accept_either_membership() {
        assert!(visibility_allows(BoardVisibility::Workspace, BOARD_MEMBER));
        assert!(visibility_allows(
            BoardVisibility::Workspace,
            WORKSPACE_MEMBER
        ));
        assert!(!visibility_allows(BoardVisibility::Workspace, NOBODY));
    }
}
