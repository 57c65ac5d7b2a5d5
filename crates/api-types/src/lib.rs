//! API types shared between the server and its clients.
//!
//! This crate contains:
//! - Row types (e.g., `Board`, `Card`) - the API representation of database entities
//! - Request types (e.g., `CreateBoardRequest`, `UpdateCardRequest`) - API input types
//! - Shared enums (e.g., `BoardVisibility`, `NotificationType`)

use serde::{Deserialize, Deserializer};

pub mod activity;
pub mod attachment;
pub mod board;
pub mod card;
pub mod checklist;
pub mod column;
pub mod comment;
pub mod invite;
pub mod label;
pub mod notification;
pub mod response;
pub mod user;
pub mod workspace;

pub use activity::*;
pub use attachment::*;
pub use board::*;
pub use card::*;
pub use checklist::*;
pub use column::*;
pub use comment::*;
pub use invite::*;
pub use label::*;
pub use notification::*;
pub use response::*;
pub use user::*;
pub use workspace::*;

/// Distinguishes "field absent" from "field explicitly null" in patch
/// requests: absent deserializes to `None`, present (even as `null`) to
/// `Some(..)`.
pub fn some_if_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
