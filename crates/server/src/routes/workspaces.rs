use axum::{
    Json,
    extract::{Extension, Path, State},
    routing::{delete, get, post},
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    ApiResponse, CreateWorkspaceRequest, NotificationType, RenameWorkspaceRequest, Workspace,
    WorkspaceDetail, WorkspaceMemberRequest,
};

use super::error::ApiError;
use crate::{
    AppState, access,
    auth::RequestContext,
    db::{
        LeaveOutcome,
        users::UserRepository,
        workspaces::WorkspaceRepository,
    },
    fanout,
    realtime::{Event, Topic},
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/workspaces", post(create_workspace).get(list_workspaces))
        .route("/workspaces/{id}", get(get_workspace).patch(rename_workspace))
        .route("/workspaces/{id}/members", post(add_member))
        .route("/workspaces/{id}/members/{user_id}", delete(remove_member))
        .route("/workspaces/{id}/leave", post(leave_workspace))
}

#[instrument(
    name = "workspaces.create",
    skip(state, ctx, payload),
    fields(user_id = %ctx.user.id)
)]
async fn create_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<Json<ApiResponse<Workspace>>, ApiError> {
    let name = payload.title.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("workspace name is required".to_string()));
    }

    let workspace = WorkspaceRepository::create(state.pool(), ctx.user.id, name).await?;

    Ok(Json(ApiResponse::ok("Workspace created", workspace)))
}

#[instrument(name = "workspaces.list", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn list_workspaces(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<Vec<WorkspaceDetail>>>, ApiError> {
    let workspaces = WorkspaceRepository::list_for_user(state.pool(), ctx.user.id).await?;

    Ok(Json(ApiResponse::ok("Workspaces fetched", workspaces)))
}

#[instrument(
    name = "workspaces.get",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn get_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<WorkspaceDetail>>, ApiError> {
    access::ensure_workspace_member(&state, workspace_id, ctx.user.id).await?;
    let detail = WorkspaceRepository::detail(state.pool(), workspace_id).await?;

    Ok(Json(ApiResponse::ok("Workspace fetched", detail)))
}

#[instrument(
    name = "workspaces.rename",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn rename_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<RenameWorkspaceRequest>,
) -> Result<Json<ApiResponse<Workspace>>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("workspace name is required".to_string()));
    }

    access::ensure_workspace_owner(&state, workspace_id, ctx.user.id).await?;
    let workspace = WorkspaceRepository::rename(state.pool(), workspace_id, name).await?;

    state
        .events()
        .publish(Topic::Workspace(workspace_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Workspace renamed", workspace)))
}

#[instrument(
    name = "workspaces.add_member",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id, member_id = %payload.user_id)
)]
async fn add_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<WorkspaceMemberRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let workspace = access::ensure_workspace_member(&state, workspace_id, ctx.user.id).await?;

    let member = UserRepository::find_summary(state.pool(), payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    WorkspaceRepository::add_member(state.pool(), workspace_id, payload.user_id).await?;

    if let Err(error) = fanout::notify_user(
        &state,
        NotificationType::AddedToWorkspace,
        ctx.user.id,
        payload.user_id,
        json!({ "workspaceId": workspace_id, "workspaceName": workspace.name }),
    )
    .await
    {
        tracing::warn!(?error, "failed to record workspace membership notification");
    }

    state.events().publish(
        Topic::Workspace(workspace_id),
        Event::NewMember(member.username),
    );

    Ok(Json(ApiResponse::ok("Member added to workspace", ())))
}

#[instrument(
    name = "workspaces.remove_member",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id, member_id = %member_id)
)]
async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((workspace_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let workspace = access::ensure_workspace_owner(&state, workspace_id, ctx.user.id).await?;
    if member_id == workspace.owner_id {
        return Err(ApiError::Validation(
            "the owner cannot be removed; leave the workspace instead".to_string(),
        ));
    }

    let member = UserRepository::find_summary(state.pool(), member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    WorkspaceRepository::remove_member(state.pool(), workspace_id, member_id).await?;

    if let Err(error) = fanout::notify_user(
        &state,
        NotificationType::RemovedFromWorkspace,
        ctx.user.id,
        member_id,
        json!({ "workspaceId": workspace_id, "workspaceName": workspace.name }),
    )
    .await
    {
        tracing::warn!(?error, "failed to record workspace removal notification");
    }

    state.events().publish(
        Topic::Workspace(workspace_id),
        Event::RemoveMember(member.username),
    );

    Ok(Json(ApiResponse::ok("Member removed from workspace", ())))
}

#[instrument(
    name = "workspaces.leave",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn leave_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let workspace = access::ensure_workspace_member(&state, workspace_id, ctx.user.id).await?;
    let remaining = WorkspaceRepository::member_ids(state.pool(), workspace_id).await?;

    let outcome = WorkspaceRepository::leave(state.pool(), workspace_id, ctx.user.id).await?;

    if outcome != LeaveOutcome::Deleted {
        if let Err(error) = fanout::notify_users(
            &state,
            NotificationType::LeftWorkspace,
            ctx.user.id,
            &remaining,
            json!({ "workspaceId": workspace_id, "workspaceName": workspace.name }),
        )
        .await
        {
            tracing::warn!(?error, "failed to record workspace leave notifications");
        }

        state.events().publish(
            Topic::Workspace(workspace_id),
            Event::LeaveMember(ctx.user.username.clone()),
        );
    }

    Ok(Json(ApiResponse::ok("Left workspace", ())))
}
