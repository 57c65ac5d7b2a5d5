use axum::{
    Json,
    extract::{Extension, Query, State},
    routing::get,
};
use tracing::instrument;

use api_types::{ApiResponse, SearchUsersQuery, User, UserSummary};

use super::error::ApiError;
use crate::{AppState, auth::RequestContext, db::users::UserRepository};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/users/me", get(me))
        .route("/users/search", get(search_users))
}

/// The identity resolved by the request middleware, echoed back to the
/// client.
#[instrument(name = "users.me", skip_all, fields(user_id = %ctx.user.id))]
async fn me(Extension(ctx): Extension<RequestContext>) -> Json<ApiResponse<User>> {
    Json(ApiResponse::ok("User fetched", ctx.user))
}

#[instrument(name = "users.search", skip(state, ctx, query), fields(user_id = %ctx.user.id))]
async fn search_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(ApiResponse::ok("Users fetched", Vec::new())));
    }

    let users = UserRepository::search(state.pool(), q).await?;

    Ok(Json(ApiResponse::ok("Users fetched", users)))
}
