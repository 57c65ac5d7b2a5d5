//! Request identity boundary.
//!
//! Credential issuance and token verification live in the external auth
//! service; by the time a request reaches this process its bearer token has
//! been exchanged for a user id. This middleware resolves that id to a user
//! row and attaches it as a [`RequestContext`] extension.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{AppState, db::users::UserRepository, routes::error::ApiError};
use api_types::User;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
}

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = extract_user_id(&request)
        .ok_or_else(|| ApiError::Unauthorized("missing or malformed credentials".to_string()))?;

    let user = UserRepository::find_by_id(state.pool(), user_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %user_id, "failed to resolve request user");
            ApiError::from(error)
        })?
        .ok_or_else(|| ApiError::Unauthorized("unknown user".to_string()))?;

    request
        .extensions_mut()
        .insert(RequestContext { user });

    Ok(next.run(request).await)
}

fn extract_user_id(request: &Request) -> Option<Uuid> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header.strip_prefix("Bearer ")?;
    Uuid::parse_str(token).ok()
}
