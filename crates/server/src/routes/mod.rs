use axum::{Router, middleware, routing::get};

use crate::{AppState, auth, realtime};

pub mod boards;
pub mod cards;
pub mod columns;
pub mod error;
pub mod invites;
pub mod labels;
pub mod notifications;
pub mod users;
pub mod workspaces;

/// Builds the full application router: the versioned REST surface behind the
/// identity middleware, plus the websocket endpoint.
pub fn router(state: AppState) -> Router<AppState> {
    let api = Router::new()
        .merge(workspaces::router())
        .merge(boards::router())
        .merge(columns::router())
        .merge(cards::router())
        .merge(labels::router())
        .merge(invites::router())
        .merge(notifications::router())
        .merge(users::router())
        .layer(middleware::from_fn_with_state(state, auth::require_user));

    Router::new()
        .nest("/api/v1", api)
        .route("/ws", get(realtime::ws::websocket))
        .route("/health", get(|| async { "ok" }))
}
