use axum::{
    Json,
    extract::{Extension, Path, State},
    routing::{patch, post, put},
};
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    ApiResponse, Column, CreateColumnRequest, MoveCardRequest, RenameColumnRequest,
    SetCardOrderRequest,
};

use super::error::ApiError;
use crate::{
    AppState, access,
    auth::RequestContext,
    db::columns::ColumnRepository,
    realtime::{Event, Topic},
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/columns", post(create_column))
        .route("/columns/move-card", post(move_card))
        .route("/columns/{id}", patch(rename_column).delete(delete_column))
        .route("/columns/{id}/card-order", put(set_card_order))
}

#[instrument(
    name = "columns.create",
    skip(state, ctx, payload),
    fields(board_id = %payload.board_id, user_id = %ctx.user.id)
)]
async fn create_column(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateColumnRequest>,
) -> Result<Json<ApiResponse<Column>>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("column title is required".to_string()));
    }

    access::ensure_board_member(&state, payload.board_id, ctx.user.id).await?;
    let column = ColumnRepository::create(state.pool(), payload.board_id, title).await?;

    state
        .events()
        .publish(Topic::Board(payload.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Column created", column)))
}

#[instrument(
    name = "columns.rename",
    skip(state, ctx, payload),
    fields(column_id = %column_id, user_id = %ctx.user.id)
)]
async fn rename_column(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(column_id): Path<Uuid>,
    Json(payload): Json<RenameColumnRequest>,
) -> Result<Json<ApiResponse<Column>>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("column title is required".to_string()));
    }

    let column = ColumnRepository::find_by_id(state.pool(), column_id).await?;
    access::ensure_board_owner(&state, column.board_id, ctx.user.id).await?;

    let column = ColumnRepository::rename(state.pool(), column_id, title).await?;

    state
        .events()
        .publish(Topic::Board(column.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Column renamed", column)))
}

#[instrument(
    name = "columns.delete",
    skip(state, ctx),
    fields(column_id = %column_id, user_id = %ctx.user.id)
)]
async fn delete_column(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(column_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Column>>, ApiError> {
    let column = ColumnRepository::find_by_id(state.pool(), column_id).await?;
    access::ensure_board_owner(&state, column.board_id, ctx.user.id).await?;

    let column = ColumnRepository::delete(state.pool(), column_id).await?;

    state
        .events()
        .publish(Topic::Board(column.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Column deleted", column)))
}

#[instrument(
    name = "columns.set_card_order",
    skip(state, ctx, payload),
    fields(column_id = %column_id, user_id = %ctx.user.id)
)]
async fn set_card_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(column_id): Path<Uuid>,
    Json(payload): Json<SetCardOrderRequest>,
) -> Result<Json<ApiResponse<Column>>, ApiError> {
    let column = ColumnRepository::find_by_id(state.pool(), column_id).await?;
    access::ensure_board_member(&state, column.board_id, ctx.user.id).await?;

    let column =
        ColumnRepository::set_card_order(state.pool(), column_id, &payload.card_order).await?;

    state
        .events()
        .publish(Topic::column(column.board_id), Event::UpdateOrderCardIds);

    Ok(Json(ApiResponse::ok("Card order updated", column)))
}

#[instrument(
    name = "columns.move_card",
    skip(state, ctx, payload),
    fields(
        card_id = %payload.card_id,
        old_column_id = %payload.old_column_id,
        new_column_id = %payload.new_column_id,
        user_id = %ctx.user.id
    )
)]
async fn move_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<MoveCardRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let column = ColumnRepository::find_by_id(state.pool(), payload.old_column_id).await?;
    access::ensure_board_member(&state, column.board_id, ctx.user.id).await?;

    ColumnRepository::move_card(state.pool(), &payload).await?;

    state
        .events()
        .publish(Topic::column(column.board_id), Event::UpdateOrderCardIds);

    Ok(Json(ApiResponse::ok("Card moved", ())))
}
