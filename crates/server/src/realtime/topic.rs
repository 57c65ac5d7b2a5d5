use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named broadcast channel. One subscription = one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Workspace(Uuid),
    Board(Uuid),
    Card(Uuid),
    User(Uuid),
}

impl Topic {
    /// Column-scoped signals are delivered on the owning board's topic, so a
    /// board view never misses a card-order change.
    pub fn column(board_id: Uuid) -> Self {
        Topic::Board(board_id)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Workspace(id) => write!(f, "workspace:{id}"),
            Topic::Board(id) => write!(f, "board:{id}"),
            Topic::Card(id) => write!(f, "card:{id}"),
            Topic::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Client → server subscription message.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum JoinMessage {
    JoinWorkspace(Uuid),
    JoinBoard(Uuid),
    /// Carries the owning board's id; kept as a distinct message for wire
    /// compatibility, routed to the board topic.
    JoinColumn(Uuid),
    JoinCard(Uuid),
    JoinUser(Uuid),
}

impl JoinMessage {
    pub fn topic(self) -> Topic {
        match self {
            JoinMessage::JoinWorkspace(id) => Topic::Workspace(id),
            JoinMessage::JoinBoard(id) => Topic::Board(id),
            JoinMessage::JoinColumn(id) => Topic::column(id),
            JoinMessage::JoinCard(id) => Topic::Card(id),
            JoinMessage::JoinUser(id) => Topic::User(id),
        }
    }
}

/// Server → client advisory signal. Payloads are short scalars at most;
/// receivers refetch authoritative state instead of applying diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    /// Generic "something changed, refetch" signal.
    Notify,
    NewMember(String),
    RemoveMember(String),
    LeaveMember(String),
    #[serde(rename = "updateColumnOrder")]
    UpdateColumnOrder,
    #[serde(rename = "updateOrderCardIds")]
    UpdateOrderCardIds,
    /// Personal signal: the recipient has a new notification record.
    Notification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_have_canonical_string_form() {
        let id = Uuid::new_v4();
        assert_eq!(Topic::Board(id).to_string(), format!("board:{id}"));
        assert_eq!(Topic::User(id).to_string(), format!("user:{id}"));
    }

    #[test]
    fn column_topic_aliases_owning_board() {
        let board_id = Uuid::new_v4();
        assert_eq!(Topic::column(board_id), Topic::Board(board_id));
        assert_eq!(
            JoinMessage::JoinColumn(board_id).topic(),
            Topic::Board(board_id)
        );
    }

    #[test]
    fn join_messages_use_socket_wire_names() {
        let id = Uuid::new_v4();
        let msg: JoinMessage =
            serde_json::from_value(serde_json::json!({ "type": "joinBoard", "id": id })).unwrap();
        assert_eq!(msg.topic(), Topic::Board(id));
    }

    #[test]
    fn events_serialize_with_wire_names() {
        let notify = serde_json::to_value(Event::Notify).unwrap();
        assert_eq!(notify["event"], "notify");

        let member = serde_json::to_value(Event::NewMember("ann".into())).unwrap();
        assert_eq!(member["event"], "new-member");
        assert_eq!(member["payload"], "ann");

        let order = serde_json::to_value(Event::UpdateColumnOrder).unwrap();
        assert_eq!(order["event"], "updateColumnOrder");
    }
}
