use axum::{
    Json,
    extract::{Extension, Path, State},
    routing::{get, put},
};
use tracing::instrument;
use uuid::Uuid;

use api_types::{ApiResponse, NotificationWithActor};

use super::error::ApiError;
use crate::{AppState, auth::RequestContext, db::notifications::NotificationRepository};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/{id}/read", put(mark_read))
}

#[instrument(name = "notifications.list", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn list_notifications(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<Vec<NotificationWithActor>>>, ApiError> {
    let notifications = NotificationRepository::list_for_user(state.pool(), ctx.user.id).await?;

    Ok(Json(ApiResponse::ok("Notifications fetched", notifications)))
}

#[instrument(name = "notifications.read_all", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn mark_all_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<u64>>, ApiError> {
    let updated = NotificationRepository::mark_all_read(state.pool(), ctx.user.id).await?;

    Ok(Json(ApiResponse::ok("Notifications marked read", updated)))
}

#[instrument(
    name = "notifications.read",
    skip(state, ctx),
    fields(notification_id = %notification_id, user_id = %ctx.user.id)
)]
async fn mark_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    NotificationRepository::mark_read(state.pool(), notification_id, ctx.user.id).await?;

    Ok(Json(ApiResponse::ok("Notification marked read", ())))
}
