use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{AppState, config::ServerConfig, realtime::EventHub, routes};

/// The assembled HTTP process: state, router, listener.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(pool: PgPool, config: ServerConfig) -> Self {
        let state = AppState::new(pool, config, Arc::new(EventHub::new()));
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.state.config().listen_addr.clone();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "listening");

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
