use axum::{
    Json,
    extract::{Extension, Path, State},
    routing::{get, post, put},
};
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    ApiResponse, CreateLabelRequest, Label, ToggleLabelResponse, UpdateLabelRequest,
};

use super::error::ApiError;
use crate::{
    AppState, access,
    auth::RequestContext,
    db::{cards::CardRepository, labels::LabelRepository},
    realtime::{Event, Topic},
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/labels", post(create_label))
        .route("/labels/{id}", put(update_label).delete(delete_label))
        .route("/labels/{id}/toggle/{card_id}", post(toggle_label))
        .route("/boards/{id}/labels", get(list_labels))
}

#[instrument(
    name = "labels.create",
    skip(state, ctx, payload),
    fields(board_id = %payload.board_id, user_id = %ctx.user.id)
)]
async fn create_label(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateLabelRequest>,
) -> Result<Json<ApiResponse<Label>>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("label name is required".to_string()));
    }

    access::ensure_board_member(&state, payload.board_id, ctx.user.id).await?;
    let label = LabelRepository::create(state.pool(), payload.board_id, name, &payload.color)
        .await?;

    state
        .events()
        .publish(Topic::Board(payload.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Label created", label)))
}

#[instrument(
    name = "labels.list",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn list_labels(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Label>>>, ApiError> {
    access::ensure_board_view(&state, board_id, ctx.user.id).await?;
    let labels = LabelRepository::list_for_board(state.pool(), board_id).await?;

    Ok(Json(ApiResponse::ok("Labels fetched", labels)))
}

#[instrument(
    name = "labels.update",
    skip(state, ctx, payload),
    fields(label_id = %label_id, user_id = %ctx.user.id)
)]
async fn update_label(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(label_id): Path<Uuid>,
    Json(payload): Json<UpdateLabelRequest>,
) -> Result<Json<ApiResponse<Label>>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("label name is required".to_string()));
    }

    let label = LabelRepository::find_by_id(state.pool(), label_id).await?;
    access::ensure_board_member(&state, label.board_id, ctx.user.id).await?;

    let label = LabelRepository::update(state.pool(), label_id, name, &payload.color).await?;

    state
        .events()
        .publish(Topic::Board(label.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Label updated", label)))
}

#[instrument(
    name = "labels.delete",
    skip(state, ctx),
    fields(label_id = %label_id, user_id = %ctx.user.id)
)]
async fn delete_label(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(label_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Label>>, ApiError> {
    let label = LabelRepository::find_by_id(state.pool(), label_id).await?;
    access::ensure_board_member(&state, label.board_id, ctx.user.id).await?;

    let label = LabelRepository::delete(state.pool(), label_id).await?;

    state
        .events()
        .publish(Topic::Board(label.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Label deleted", label)))
}

#[instrument(
    name = "labels.toggle",
    skip(state, ctx),
    fields(label_id = %label_id, card_id = %card_id, user_id = %ctx.user.id)
)]
async fn toggle_label(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((label_id, card_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ToggleLabelResponse>>, ApiError> {
    let label = LabelRepository::find_by_id(state.pool(), label_id).await?;
    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    if card.board_id != label.board_id {
        return Err(ApiError::Validation(
            "label and card belong to different boards".to_string(),
        ));
    }
    access::ensure_board_member(&state, label.board_id, ctx.user.id).await?;

    let action = LabelRepository::toggle_on_card(state.pool(), label_id, card_id).await?;

    state.events().publish(Topic::Card(card_id), Event::Notify);
    state
        .events()
        .publish(Topic::Board(label.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok(
        "Label toggled",
        ToggleLabelResponse { action },
    )))
}
