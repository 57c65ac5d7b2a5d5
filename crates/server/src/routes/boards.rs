use axum::{
    Json,
    extract::{Extension, Path, State},
    routing::{delete, get, post, put},
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    ApiResponse, Board, BoardDetail, BoardMemberRequest, ChangeVisibilityRequest,
    CreateBoardRequest, NotificationType, SetColumnOrderRequest, UpdateBoardRequest,
};

use super::error::ApiError;
use crate::{
    AppState, access,
    auth::RequestContext,
    db::{LeaveOutcome, boards::BoardRepository, users::UserRepository},
    fanout,
    realtime::{Event, Topic},
    text,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/boards", post(create_board))
        .route("/boards/starred", get(starred_boards))
        .route("/boards/{id}", get(get_board).patch(update_board))
        .route("/boards/{id}/close", put(close_board))
        .route("/boards/{id}/reopen", put(reopen_board))
        .route("/boards/{id}/visibility", put(change_visibility))
        .route("/boards/{id}/column-order", put(set_column_order))
        .route("/boards/{id}/members", post(add_member))
        .route("/boards/{id}/members/{user_id}", delete(remove_member))
        .route("/boards/{id}/leave", post(leave_board))
        .route("/boards/{id}/star", post(toggle_starred))
}

#[instrument(
    name = "boards.create",
    skip(state, ctx, payload),
    fields(workspace_id = %payload.workspace_id, user_id = %ctx.user.id)
)]
async fn create_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateBoardRequest>,
) -> Result<Json<ApiResponse<Board>>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("board title is required".to_string()));
    }

    access::ensure_workspace_member(&state, payload.workspace_id, ctx.user.id).await?;

    let slug = text::slugify(title);
    let board = BoardRepository::create(
        state.pool(),
        ctx.user.id,
        payload.workspace_id,
        title,
        &slug,
        payload.description.as_deref(),
        payload.visibility,
    )
    .await?;

    state
        .events()
        .publish(Topic::Workspace(payload.workspace_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Board created", board)))
}

#[instrument(
    name = "boards.get",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn get_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ApiResponse<BoardDetail>>, ApiError> {
    access::ensure_board_view(&state, board_id, ctx.user.id).await?;
    let detail = BoardRepository::detail(state.pool(), board_id).await?;

    Ok(Json(ApiResponse::ok("Board fetched", detail)))
}

#[instrument(
    name = "boards.update",
    skip(state, ctx, payload),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn update_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<UpdateBoardRequest>,
) -> Result<Json<ApiResponse<Board>>, ApiError> {
    if let Some(title) = &payload.title
        && title.trim().is_empty()
    {
        return Err(ApiError::Validation("board title cannot be empty".to_string()));
    }

    access::ensure_board_owner(&state, board_id, ctx.user.id).await?;
    let board = BoardRepository::update(state.pool(), board_id, &payload).await?;

    state.events().publish(Topic::Board(board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Board updated", board)))
}

#[instrument(
    name = "boards.close",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn close_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Board>>, ApiError> {
    access::ensure_board_owner(&state, board_id, ctx.user.id).await?;
    let board = BoardRepository::set_closed(state.pool(), board_id, true).await?;

    state.events().publish(Topic::Board(board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Board closed", board)))
}

#[instrument(
    name = "boards.reopen",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn reopen_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Board>>, ApiError> {
    access::ensure_board_owner(&state, board_id, ctx.user.id).await?;
    let board = BoardRepository::set_closed(state.pool(), board_id, false).await?;

    state.events().publish(Topic::Board(board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Board reopened", board)))
}

#[instrument(
    name = "boards.change_visibility",
    skip(state, ctx, payload),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn change_visibility(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<ChangeVisibilityRequest>,
) -> Result<Json<ApiResponse<Board>>, ApiError> {
    access::ensure_board_owner(&state, board_id, ctx.user.id).await?;
    let board = BoardRepository::set_visibility(state.pool(), board_id, payload.visibility).await?;

    state.events().publish(Topic::Board(board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Board visibility changed", board)))
}

#[instrument(
    name = "boards.set_column_order",
    skip(state, ctx, payload),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn set_column_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<SetColumnOrderRequest>,
) -> Result<Json<ApiResponse<Board>>, ApiError> {
    access::ensure_board_member(&state, board_id, ctx.user.id).await?;
    let board =
        BoardRepository::set_column_order(state.pool(), board_id, &payload.column_order).await?;

    state
        .events()
        .publish(Topic::Board(board_id), Event::UpdateColumnOrder);

    Ok(Json(ApiResponse::ok("Column order updated", board)))
}

#[instrument(
    name = "boards.add_member",
    skip(state, ctx, payload),
    fields(board_id = %board_id, user_id = %ctx.user.id, member_id = %payload.user_id)
)]
async fn add_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<BoardMemberRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let board = access::ensure_board_member(&state, board_id, ctx.user.id).await?;

    let member = UserRepository::find_summary(state.pool(), payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    BoardRepository::add_member(state.pool(), board_id, payload.user_id).await?;

    if let Err(error) = fanout::notify_user(
        &state,
        NotificationType::AddedToBoard,
        ctx.user.id,
        payload.user_id,
        json!({ "boardId": board_id, "boardTitle": board.title }),
    )
    .await
    {
        tracing::warn!(?error, "failed to record board membership notification");
    }

    state
        .events()
        .publish(Topic::Board(board_id), Event::NewMember(member.username));

    Ok(Json(ApiResponse::ok("Member added to board", ())))
}

#[instrument(
    name = "boards.remove_member",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id, member_id = %member_id)
)]
async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((board_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let board = access::ensure_board_owner(&state, board_id, ctx.user.id).await?;
    if member_id == board.owner_id {
        return Err(ApiError::Validation(
            "the owner cannot be removed; leave the board instead".to_string(),
        ));
    }

    let member = UserRepository::find_summary(state.pool(), member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    BoardRepository::remove_member(state.pool(), board_id, member_id).await?;

    if let Err(error) = fanout::notify_user(
        &state,
        NotificationType::RemovedFromBoard,
        ctx.user.id,
        member_id,
        json!({ "boardId": board_id, "boardTitle": board.title }),
    )
    .await
    {
        tracing::warn!(?error, "failed to record board removal notification");
    }

    state
        .events()
        .publish(Topic::Board(board_id), Event::RemoveMember(member.username));

    Ok(Json(ApiResponse::ok("Member removed from board", ())))
}

#[instrument(
    name = "boards.leave",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn leave_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let board = access::ensure_board_member(&state, board_id, ctx.user.id).await?;
    let remaining = BoardRepository::member_ids(state.pool(), board_id).await?;

    let outcome = BoardRepository::leave(state.pool(), board_id, ctx.user.id).await?;

    if outcome != LeaveOutcome::Deleted {
        if let Err(error) = fanout::notify_users(
            &state,
            NotificationType::LeftBoard,
            ctx.user.id,
            &remaining,
            json!({ "boardId": board_id, "boardTitle": board.title }),
        )
        .await
        {
            tracing::warn!(?error, "failed to record board leave notifications");
        }

        state.events().publish(
            Topic::Board(board_id),
            Event::LeaveMember(ctx.user.username.clone()),
        );
    }

    Ok(Json(ApiResponse::ok("Left board", ())))
}

#[instrument(
    name = "boards.toggle_starred",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn toggle_starred(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    access::ensure_board_member(&state, board_id, ctx.user.id).await?;
    let starred = BoardRepository::toggle_starred(state.pool(), board_id, ctx.user.id).await?;

    // Per-user state: wake the user's own topic so their other devices
    // refetch, not the shared board topic.
    state
        .events()
        .publish(Topic::User(ctx.user.id), Event::Notify);

    Ok(Json(ApiResponse::ok("Board star toggled", starred)))
}

#[instrument(name = "boards.starred", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn starred_boards(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<Vec<Board>>>, ApiError> {
    let boards = BoardRepository::starred_for_user(state.pool(), ctx.user.id).await?;

    Ok(Json(ApiResponse::ok("Starred boards fetched", boards)))
}
