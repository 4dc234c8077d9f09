//! WebSocket message dispatch
//!
//! Entry point for client messages and disconnects. Every action runs to
//! completion under the lobby's lock, including whatever it cascades into.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::LobbyRegistry;

use super::{player, Session};

/// Handle client messages and return an optional reply for the sender only
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    registry: &LobbyRegistry,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::JoinLobby { code, name } => {
            player::handle_join(session, registry, &code, name.as_deref()).await
        }

        ClientMessage::SubmitAnswer { answer } => {
            player::handle_submit_answer(session, registry, answer).await
        }

        ClientMessage::PlayerReady => player::handle_ready(session, registry).await,

        ClientMessage::StartRound => player::handle_start_round(session, registry).await,

        ClientMessage::VoteEndGame => player::handle_vote_end_game(session, registry).await,
    }
}

/// The connection is gone: remove its player like any other serialized event
pub async fn handle_disconnect(session: &mut Session, registry: &LobbyRegistry) {
    session.events = None;
    if let Some(code) = session.lobby.take() {
        registry.leave(&code, &session.connection_id).await;
    }
}
