//! Realtime broadcast layer: topic model, connection hub, WebSocket endpoint.
//!
//! Connected clients join topics for the entities they are viewing; mutation
//! handlers publish advisory signals after their store writes commit. The
//! signals carry no authoritative state; clients refetch over HTTP.

mod hub;
mod topic;
pub mod ws;

pub use hub::{ConnectionId, EventHub};
pub use topic::{Event, JoinMessage, Topic};
