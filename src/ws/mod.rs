pub mod handlers;
pub mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::LobbyRegistry;
use crate::types::{LobbyCode, PlayerId};

pub const PROTOCOL_VERSION: &str = "1.0";

/// Per-connection state. The connection id doubles as the player id, so a
/// reconnect is always a new player.
#[derive(Debug)]
pub struct Session {
    pub connection_id: PlayerId,
    pub lobby: Option<LobbyCode>,
    pub events: Option<broadcast::Receiver<ServerMessage>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            connection_id: ulid::Ulid::new().to_string(),
            lobby: None,
            events: None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<LobbyRegistry>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

/// Wait for the next lobby broadcast; pends forever while not in a lobby
async fn next_event(
    events: &mut Option<broadcast::Receiver<ServerMessage>>,
) -> Result<ServerMessage, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn to_frame(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, registry: LobbyRegistry) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::new();

    tracing::info!("WebSocket connected: {}", session.connection_id);

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        connection_id: session.connection_id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Some(frame) = to_frame(&welcome) {
        if sender.send(frame).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    loop {
        tokio::select! {
            // Lobby broadcasts
            event = next_event(&mut session.events) => {
                match event {
                    Ok(msg) => {
                        if let Some(frame) = to_frame(&msg) {
                            if sender.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Connection {} lagged behind, skipped {} messages",
                            session.connection_id,
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => {
                        // Lobby was disposed
                        session.events = None;
                        session.lobby = None;
                    }
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text.as_str());

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &mut session, &registry).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(frame) = response.as_ref().and_then(to_frame) {
                            if sender.send(frame).await.is_err() {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    handlers::handle_disconnect(&mut session, &registry).await;
    tracing::info!("WebSocket connection closed: {}", session.connection_id);
}
