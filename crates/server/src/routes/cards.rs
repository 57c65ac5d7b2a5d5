use axum::{
    Json,
    extract::{Extension, Path, State},
    routing::{delete, get, post, put},
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    AddAttachmentsRequest, AddChecklistItemRequest, ApiResponse, Attachment, Card, CardDetail,
    CardMemberRequest, ChecklistItem, ChecklistRow, Comment, CommentWithAuthor,
    CompleteCardRequest, CreateCardRequest, CreateChecklistRequest, CreateCommentRequest,
    NotificationType, SetCardDatesRequest, UpdateCardRequest, UpdateCommentRequest,
};

use super::error::ApiError;
use crate::{
    AppState, access,
    auth::RequestContext,
    db::{cards::CardRepository, users::UserRepository},
    fanout,
    realtime::{Event, Topic},
    text,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/cards", post(create_card))
        .route("/cards/{id}", get(get_card).patch(update_card).delete(delete_card))
        .route("/cards/{id}/dates", put(set_dates))
        .route("/cards/{id}/complete", put(set_complete))
        .route("/cards/{id}/members", post(add_member))
        .route("/cards/{id}/members/{user_id}", delete(remove_member))
        .route("/cards/{id}/comments", post(add_comment))
        .route("/comments/{id}", axum::routing::patch(update_comment).delete(delete_comment))
        .route("/cards/{id}/checklists", post(create_checklist))
        .route("/checklists/{id}", delete(delete_checklist))
        .route("/checklists/{id}/items", post(add_checklist_item))
        .route("/checklist-items/{id}/toggle", put(toggle_checklist_item))
        .route("/checklist-items/{id}", delete(delete_checklist_item))
        .route("/cards/{id}/attachments", post(add_attachments))
}

/// Card-scoped signals go to both the card topic (open card dialogs) and the
/// owning board topic (board views showing the card face).
fn publish_card(state: &AppState, card: &Card, event: Event) {
    state.events().publish(Topic::Card(card.id), event.clone());
    state.events().publish(Topic::Board(card.board_id), event);
}

#[instrument(
    name = "cards.create",
    skip(state, ctx, payload),
    fields(column_id = %payload.column_id, user_id = %ctx.user.id)
)]
async fn create_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<Json<ApiResponse<Card>>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("card title is required".to_string()));
    }

    access::ensure_board_member(&state, payload.board_id, ctx.user.id).await?;

    let card = CardRepository::create(
        state.pool(),
        ctx.user.id,
        payload.column_id,
        payload.board_id,
        title,
    )
    .await?;

    state
        .events()
        .publish(Topic::Board(card.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Card created", card)))
}

#[instrument(
    name = "cards.get",
    skip(state, ctx),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn get_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CardDetail>>, ApiError> {
    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_view(&state, card.board_id, ctx.user.id).await?;

    let detail = CardRepository::detail(state.pool(), card_id).await?;

    Ok(Json(ApiResponse::ok("Card fetched", detail)))
}

#[instrument(
    name = "cards.update",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn update_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<Json<ApiResponse<Card>>, ApiError> {
    if let Some(title) = &payload.title
        && title.trim().is_empty()
    {
        return Err(ApiError::Validation("card title cannot be empty".to_string()));
    }

    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let card = CardRepository::update(state.pool(), card_id, &payload).await?;
    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Card updated", card)))
}

#[instrument(
    name = "cards.set_dates",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn set_dates(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<SetCardDatesRequest>,
) -> Result<Json<ApiResponse<Card>>, ApiError> {
    if let (Some(start), Some(due)) = (payload.start_date, payload.due_date)
        && due < start
    {
        return Err(ApiError::Validation(
            "due date cannot be before the start date".to_string(),
        ));
    }

    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let card =
        CardRepository::set_dates(state.pool(), card_id, payload.start_date, payload.due_date)
            .await?;
    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Card dates updated", card)))
}

#[instrument(
    name = "cards.set_complete",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn set_complete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<CompleteCardRequest>,
) -> Result<Json<ApiResponse<Card>>, ApiError> {
    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let members = CardRepository::member_ids(state.pool(), card_id).await?;
    let card =
        CardRepository::set_complete(state.pool(), card_id, ctx.user.id, payload.is_complete)
            .await?;

    let notification_type = if card.is_complete {
        NotificationType::CardCompleted
    } else {
        NotificationType::CardUncompleted
    };
    if let Err(error) = fanout::notify_users(
        &state,
        notification_type,
        ctx.user.id,
        &members,
        json!({ "cardId": card.id, "cardTitle": card.title, "boardId": card.board_id }),
    )
    .await
    {
        tracing::warn!(?error, "failed to record card completion notifications");
    }

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Card completion updated", card)))
}

#[instrument(
    name = "cards.delete",
    skip(state, ctx),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn delete_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Card>>, ApiError> {
    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let card = CardRepository::delete(state.pool(), card_id).await?;

    state
        .events()
        .publish(Topic::Board(card.board_id), Event::Notify);

    Ok(Json(ApiResponse::ok("Card deleted", card)))
}

#[instrument(
    name = "cards.add_member",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id, member_id = %payload.user_id)
)]
async fn add_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<CardMemberRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let member = UserRepository::find_summary(state.pool(), payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    CardRepository::add_member(
        state.pool(),
        card_id,
        card.board_id,
        ctx.user.id,
        payload.user_id,
        &member.username,
    )
    .await?;

    if let Err(error) = fanout::notify_user(
        &state,
        NotificationType::AddedToCard,
        ctx.user.id,
        payload.user_id,
        json!({ "cardId": card.id, "cardTitle": card.title, "boardId": card.board_id }),
    )
    .await
    {
        tracing::warn!(?error, "failed to record card membership notification");
    }

    publish_card(&state, &card, Event::NewMember(member.username));

    Ok(Json(ApiResponse::ok("Member added to card", ())))
}

#[instrument(
    name = "cards.remove_member",
    skip(state, ctx),
    fields(card_id = %card_id, user_id = %ctx.user.id, member_id = %member_id)
)]
async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((card_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let member = UserRepository::find_summary(state.pool(), member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    let leaving = member_id == ctx.user.id;
    let remaining = CardRepository::member_ids(state.pool(), card_id).await?;

    CardRepository::remove_member(state.pool(), card_id, ctx.user.id, member_id).await?;

    let result = if leaving {
        fanout::notify_users(
            &state,
            NotificationType::LeftCard,
            ctx.user.id,
            &remaining,
            json!({ "cardId": card.id, "cardTitle": card.title, "boardId": card.board_id }),
        )
        .await
    } else {
        fanout::notify_user(
            &state,
            NotificationType::RemovedFromCard,
            ctx.user.id,
            member_id,
            json!({ "cardId": card.id, "cardTitle": card.title, "boardId": card.board_id }),
        )
        .await
    };
    if let Err(error) = result {
        tracing::warn!(?error, "failed to record card member removal notification");
    }

    let event = if leaving {
        Event::LeaveMember(member.username)
    } else {
        Event::RemoveMember(member.username)
    };
    publish_card(&state, &card, event);

    Ok(Json(ApiResponse::ok("Member removed from card", ())))
}

#[instrument(
    name = "cards.add_comment",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn add_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<ApiResponse<CommentWithAuthor>>, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("comment cannot be empty".to_string()));
    }

    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let comment =
        CardRepository::add_comment(state.pool(), card_id, ctx.user.id, &payload.content).await?;

    let mentioned = text::extract_mention_ids(&payload.content);
    if !mentioned.is_empty()
        && let Err(error) = fanout::notify_users(
            &state,
            NotificationType::TaggedInComment,
            ctx.user.id,
            &mentioned,
            json!({ "cardId": card.id, "cardTitle": card.title, "boardId": card.board_id }),
        )
        .await
    {
        tracing::warn!(?error, "failed to record mention notifications");
    }

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Comment added", comment)))
}

#[instrument(
    name = "cards.update_comment",
    skip(state, ctx, payload),
    fields(comment_id = %comment_id, user_id = %ctx.user.id)
)]
async fn update_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<ApiResponse<CommentWithAuthor>>, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("comment cannot be empty".to_string()));
    }

    let existing = CardRepository::find_comment(state.pool(), comment_id).await?;
    let card = CardRepository::find_by_id(state.pool(), existing.card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let comment =
        CardRepository::update_comment(state.pool(), comment_id, ctx.user.id, &payload.content)
            .await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Comment updated", comment)))
}

#[instrument(
    name = "cards.delete_comment",
    skip(state, ctx),
    fields(comment_id = %comment_id, user_id = %ctx.user.id)
)]
async fn delete_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Comment>>, ApiError> {
    let existing = CardRepository::find_comment(state.pool(), comment_id).await?;
    let card = CardRepository::find_by_id(state.pool(), existing.card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let comment = CardRepository::delete_comment(state.pool(), comment_id, ctx.user.id).await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Comment deleted", comment)))
}

#[instrument(
    name = "cards.create_checklist",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn create_checklist(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<CreateChecklistRequest>,
) -> Result<Json<ApiResponse<ChecklistRow>>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("checklist title is required".to_string()));
    }

    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let checklist = CardRepository::create_checklist(state.pool(), card_id, title).await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Checklist created", checklist)))
}

#[instrument(
    name = "cards.delete_checklist",
    skip(state, ctx),
    fields(checklist_id = %checklist_id, user_id = %ctx.user.id)
)]
async fn delete_checklist(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(checklist_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let card = CardRepository::card_for_checklist(state.pool(), checklist_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    CardRepository::delete_checklist(state.pool(), checklist_id).await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Checklist deleted", ())))
}

#[instrument(
    name = "cards.add_checklist_item",
    skip(state, ctx, payload),
    fields(checklist_id = %checklist_id, user_id = %ctx.user.id)
)]
async fn add_checklist_item(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(checklist_id): Path<Uuid>,
    Json(payload): Json<AddChecklistItemRequest>,
) -> Result<Json<ApiResponse<ChecklistItem>>, ApiError> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("checklist item text is required".to_string()));
    }

    let card = CardRepository::card_for_checklist(state.pool(), checklist_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let item = CardRepository::add_checklist_item(state.pool(), checklist_id, text).await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Checklist item added", item)))
}

#[instrument(
    name = "cards.toggle_checklist_item",
    skip(state, ctx),
    fields(item_id = %item_id, user_id = %ctx.user.id)
)]
async fn toggle_checklist_item(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChecklistItem>>, ApiError> {
    let card = CardRepository::card_for_checklist_item(state.pool(), item_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let item = CardRepository::toggle_checklist_item(state.pool(), item_id).await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Checklist item toggled", item)))
}

#[instrument(
    name = "cards.delete_checklist_item",
    skip(state, ctx),
    fields(item_id = %item_id, user_id = %ctx.user.id)
)]
async fn delete_checklist_item(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let card = CardRepository::card_for_checklist_item(state.pool(), item_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    CardRepository::delete_checklist_item(state.pool(), item_id).await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Checklist item deleted", ())))
}

#[instrument(
    name = "cards.add_attachments",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn add_attachments(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<AddAttachmentsRequest>,
) -> Result<Json<ApiResponse<Vec<Attachment>>>, ApiError> {
    if payload.files.is_empty() {
        return Err(ApiError::Validation("no files given".to_string()));
    }

    let card = CardRepository::find_by_id(state.pool(), card_id).await?;
    access::ensure_board_member(&state, card.board_id, ctx.user.id).await?;

    let attachments = CardRepository::add_attachments(
        state.pool(),
        card_id,
        ctx.user.id,
        payload.attachment_type,
        &payload.files,
    )
    .await?;

    publish_card(&state, &card, Event::Notify);

    Ok(Json(ApiResponse::ok("Attachments added", attachments)))
}
