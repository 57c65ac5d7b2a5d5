use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use super::topic::JoinMessage;
use crate::AppState;

/// `GET /ws` — the single persistent connection per client. The client joins
/// topics by sending `{"type": "joinBoard", "id": "<uuid>"}` style messages;
/// the server pushes advisory events until the socket closes.
pub async fn websocket(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (connection, mut events) = state.events().connect();
    tracing::debug!(?connection, "realtime client connected");

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(error) => {
                    tracing::error!(?error, "failed to serialize broadcast event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<JoinMessage>(&text) {
                            Ok(join) => state.events().join(connection, join.topic()),
                            Err(error) => {
                                tracing::debug!(?error, "ignoring unrecognized client message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::debug!(?error, "websocket read error");
                        break;
                    }
                }
            }
            _ = &mut writer => break,
        }
    }

    writer.abort();
    state.events().disconnect(connection);
    tracing::debug!(?connection, "realtime client disconnected");
}
