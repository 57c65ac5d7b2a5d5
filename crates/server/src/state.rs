use std::sync::Arc;

use sqlx::PgPool;

use crate::{config::ServerConfig, realtime::EventHub};

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    config: ServerConfig,
    events: Arc<EventHub>,
}

impl AppState {
    pub fn new(pool: PgPool, config: ServerConfig, events: Arc<EventHub>) -> Self {
        Self {
            pool,
            config,
            events,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }
}
