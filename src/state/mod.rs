mod code;
mod lobby;
mod player;
mod round;
mod score;
mod vote;

pub use code::{normalize_code, CODE_CHARS, CODE_LENGTH};
pub use lobby::{JoinedLobby, Lobby, RoundPhase};
pub use player::{sanitize_name, PlayerRegistry};
pub use score::ScoreBoard;

use crate::error::LobbyError;
use crate::questions::QuestionSource;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// A lobby behind its own lock. Holding the lock is the only way to touch it.
pub type SharedLobby = Arc<Mutex<Lobby>>;

/// Process-wide registry of open lobbies.
///
/// Cheap to clone; every clone refers to the same lobbies. Lock order is
/// registry first, then lobby.
#[derive(Clone)]
pub struct LobbyRegistry {
    lobbies: Arc<RwLock<HashMap<LobbyCode, SharedLobby>>>,
    questions: Arc<QuestionSource>,
    max_players: usize,
}

impl LobbyRegistry {
    pub fn new(questions: Arc<QuestionSource>, max_players: usize) -> Self {
        Self {
            lobbies: Arc::new(RwLock::new(HashMap::new())),
            questions,
            max_players,
        }
    }

    /// Open a new lobby under a fresh code
    pub async fn create_lobby(&self, settings: LobbySettings) -> LobbyCode {
        let mut lobbies = self.lobbies.write().await;
        let code = code::generate_unique_code(|c| lobbies.contains_key(c));

        let lobby = Lobby::new(
            code.clone(),
            settings,
            self.questions.clone(),
            self.max_players,
        );
        lobbies.insert(code.clone(), Arc::new(Mutex::new(lobby)));

        tracing::info!(
            "Created lobby {} ({:?}, limit {:?})",
            code,
            settings.mode,
            settings.question_limit
        );
        code
    }

    /// Look up a lobby by user-entered code
    pub async fn get(&self, code: &str) -> Result<SharedLobby, LobbyError> {
        let code = normalize_code(code)?;
        self.lobbies
            .read()
            .await
            .get(&code)
            .cloned()
            .ok_or(LobbyError::LobbyNotFound)
    }

    pub async fn len(&self) -> usize {
        self.lobbies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Seat a connection in the lobby with the given code
    pub async fn join(
        &self,
        code: &str,
        player_id: PlayerId,
        name: Option<&str>,
    ) -> Result<JoinedLobby, LobbyError> {
        let lobby = self.get(code).await?;
        let mut lobby = lobby.lock().await;
        lobby.join(player_id, name)
    }

    /// Remove a disconnected player, disposing the lobby if it is now empty
    pub async fn leave(&self, code: &str, player_id: &str) {
        let Ok(lobby) = self.get(code).await else {
            return;
        };

        let now_empty = lobby.lock().await.leave(player_id);
        if now_empty {
            self.dispose_if_empty(code).await;
        }
    }

    /// Drop a lobby that has no connected players. Re-checked under both locks,
    /// so a join that slipped in between keeps the lobby alive.
    pub async fn dispose_if_empty(&self, code: &str) -> bool {
        let mut lobbies = self.lobbies.write().await;
        let Some(lobby) = lobbies.get(code).cloned() else {
            return false;
        };

        let mut lobby = lobby.lock().await;
        if lobby.players().connected_count() > 0 {
            return false;
        }

        lobby.close();
        lobbies.remove(code);
        tracing::info!("Disposed empty lobby {}", code);
        true
    }

    /// Dispose every lobby that has been empty for at least `max_idle`.
    /// Returns how many were removed.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let mut lobbies = self.lobbies.write().await;
        let mut expired = Vec::new();

        for (code, lobby) in lobbies.iter() {
            let mut lobby = lobby.lock().await;
            if lobby.players().connected_count() == 0 && lobby.idle_for(max_idle) {
                lobby.close();
                expired.push(code.clone());
            }
        }

        for code in &expired {
            lobbies.remove(code);
            tracing::info!("Disposed idle lobby {}", code);
        }
        expired.len()
    }
}
