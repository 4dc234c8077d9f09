//! Player message handlers

use crate::error::LobbyError;
use crate::protocol::ServerMessage;
use crate::state::{LobbyRegistry, SharedLobby};
use crate::types::RawAnswer;

use super::Session;

/// The lobby this connection has joined
async fn current_lobby(
    session: &Session,
    registry: &LobbyRegistry,
) -> Result<SharedLobby, LobbyError> {
    let code = session.lobby.as_deref().ok_or(LobbyError::NotInLobby)?;
    registry.get(code).await
}

pub async fn handle_join(
    session: &mut Session,
    registry: &LobbyRegistry,
    code: &str,
    name: Option<&str>,
) -> Option<ServerMessage> {
    tracing::info!("Join request for lobby {}", code);

    // One seat per connection: switching lobbies leaves the old one first
    if let Some(previous) = session.lobby.take() {
        session.events = None;
        registry.leave(&previous, &session.connection_id).await;
    }

    match registry
        .join(code, session.connection_id.clone(), name)
        .await
    {
        Ok(joined) => {
            session.lobby = Some(joined.code);
            session.events = Some(joined.events);
            Some(ServerMessage::JoinResult {
                success: true,
                error: None,
                lobby: Some(Box::new(joined.snapshot)),
                player_id: Some(joined.player.id),
            })
        }
        Err(e) => {
            tracing::info!("Join for lobby {} failed: {}", code, e.code());
            Some(ServerMessage::join_failed(&e))
        }
    }
}

pub async fn handle_submit_answer(
    session: &Session,
    registry: &LobbyRegistry,
    answer: RawAnswer,
) -> Option<ServerMessage> {
    let result = match current_lobby(session, registry).await {
        Ok(lobby) => {
            let mut lobby = lobby.lock().await;
            lobby.submit_answer(&session.connection_id, answer)
        }
        Err(e) => Err(e),
    };

    // Rejected answers are dropped without telling anyone
    if let Err(e) = result {
        tracing::debug!(
            "Ignoring answer from {}: {}",
            session.connection_id,
            e
        );
    }
    None
}

pub async fn handle_ready(session: &Session, registry: &LobbyRegistry) -> Option<ServerMessage> {
    match current_lobby(session, registry).await {
        Ok(lobby) => {
            let mut lobby = lobby.lock().await;
            lobby.player_ready(&session.connection_id);
        }
        Err(e) => tracing::debug!("Ignoring ready from {}: {}", session.connection_id, e),
    }
    None
}

pub async fn handle_start_round(
    session: &Session,
    registry: &LobbyRegistry,
) -> Option<ServerMessage> {
    match current_lobby(session, registry).await {
        Ok(lobby) => {
            let mut lobby = lobby.lock().await;
            lobby.request_start();
        }
        Err(e) => tracing::debug!("Ignoring start from {}: {}", session.connection_id, e),
    }
    None
}

pub async fn handle_vote_end_game(
    session: &Session,
    registry: &LobbyRegistry,
) -> Option<ServerMessage> {
    let result = match current_lobby(session, registry).await {
        Ok(lobby) => {
            let mut lobby = lobby.lock().await;
            lobby.vote_end_game(&session.connection_id)
        }
        Err(e) => Err(e),
    };

    Some(match result {
        Ok(()) => ServerMessage::VoteResult {
            success: true,
            error: None,
        },
        Err(e) => {
            tracing::debug!("Vote from {} rejected: {}", session.connection_id, e);
            ServerMessage::VoteResult {
                success: false,
                error: Some((&e).into()),
            }
        }
    })
}
