use axum::{
    Json,
    extract::{Extension, Path, State},
    routing::{get, post},
};
use serde_json::json;
use tracing::instrument;

use api_types::{
    ApiResponse, CreateInviteRequest, CreateInviteResponse, NotificationType,
    VerifyInviteResponse,
};

use super::error::ApiError;
use crate::{
    AppState, access,
    auth::RequestContext,
    db::{
        boards::BoardRepository, invites::InviteRepository, workspaces::WorkspaceRepository,
    },
    fanout,
    realtime::{Event, Topic},
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/invites", post(create_invite))
        .route("/invites/{token}/verify", get(verify_invite))
        .route("/invites/{token}/join", post(join_via_invite))
}

#[instrument(
    name = "invites.create",
    skip(state, ctx, payload),
    fields(user_id = %ctx.user.id)
)]
async fn create_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateInviteRequest>,
) -> Result<Json<ApiResponse<CreateInviteResponse>>, ApiError> {
    match (payload.workspace_id, payload.board_id) {
        (Some(workspace_id), None) => {
            access::ensure_workspace_member(&state, workspace_id, ctx.user.id).await?;
        }
        (None, Some(board_id)) => {
            access::ensure_board_member(&state, board_id, ctx.user.id).await?;
        }
        _ => {
            return Err(ApiError::Validation(
                "exactly one of workspace_id or board_id is required".to_string(),
            ));
        }
    }

    let invite = InviteRepository::create(
        state.pool(),
        payload.workspace_id,
        payload.board_id,
        state.config().invite_ttl_hours,
    )
    .await?;

    let link = format!(
        "{}/invite/{}",
        state.config().frontend_base_url.trim_end_matches('/'),
        invite.token
    );

    Ok(Json(ApiResponse::ok("Invite created", CreateInviteResponse { link })))
}

#[instrument(name = "invites.verify", skip(state, ctx, token), fields(user_id = %ctx.user.id))]
async fn verify_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<VerifyInviteResponse>>, ApiError> {
    let invite = InviteRepository::verify(state.pool(), &token).await?;

    Ok(Json(ApiResponse::ok(
        "Invite is valid",
        VerifyInviteResponse {
            workspace_id: invite.workspace_id,
            board_id: invite.board_id,
        },
    )))
}

/// Redeems the invite for the calling user. Tokens are multi-use until
/// expiry; joining twice is a no-op.
#[instrument(name = "invites.join", skip(state, ctx, token), fields(user_id = %ctx.user.id))]
async fn join_via_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<VerifyInviteResponse>>, ApiError> {
    let invite = InviteRepository::verify(state.pool(), &token).await?;

    if let Some(workspace_id) = invite.workspace_id {
        let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id).await?;
        if !WorkspaceRepository::is_member(state.pool(), workspace_id, ctx.user.id).await? {
            WorkspaceRepository::add_member(state.pool(), workspace_id, ctx.user.id).await?;

            if let Err(error) = fanout::notify_user(
                &state,
                NotificationType::AddedToWorkspace,
                ctx.user.id,
                workspace.owner_id,
                json!({ "workspaceId": workspace_id, "workspaceName": workspace.name }),
            )
            .await
            {
                tracing::warn!(?error, "failed to record invite join notification");
            }

            state.events().publish(
                Topic::Workspace(workspace_id),
                Event::NewMember(ctx.user.username.clone()),
            );
        }
    }

    if let Some(board_id) = invite.board_id {
        let board = BoardRepository::find_by_id(state.pool(), board_id).await?;
        if !BoardRepository::is_member(state.pool(), board_id, ctx.user.id).await? {
            BoardRepository::add_member(state.pool(), board_id, ctx.user.id).await?;

            if let Err(error) = fanout::notify_user(
                &state,
                NotificationType::AddedToBoard,
                ctx.user.id,
                board.owner_id,
                json!({ "boardId": board_id, "boardTitle": board.title }),
            )
            .await
            {
                tracing::warn!(?error, "failed to record invite join notification");
            }

            state.events().publish(
                Topic::Board(board_id),
                Event::NewMember(ctx.user.username.clone()),
            );
        }
    }

    Ok(Json(ApiResponse::ok(
        "Joined via invite",
        VerifyInviteResponse {
            workspace_id: invite.workspace_id,
            board_id: invite.board_id,
        },
    )))
}
