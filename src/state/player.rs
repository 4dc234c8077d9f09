use crate::error::LobbyError;
use crate::types::*;

/// Players of one lobby, in join order
#[derive(Debug, Clone)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    max_players: usize,
}

/// Trim and cap a requested display name, falling back to the default name
pub fn sanitize_name(raw: Option<&str>) -> Result<String, LobbyError> {
    let trimmed = raw.unwrap_or_default().trim();
    if trimmed.chars().any(char::is_control) {
        return Err(LobbyError::InvalidName);
    }

    let name: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    let name = name.trim_end().to_string();
    if name.is_empty() {
        Ok(DEFAULT_PLAYER_NAME.to_string())
    } else {
        Ok(name)
    }
}

impl PlayerRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            players: Vec::new(),
            max_players,
        }
    }

    /// Add a player for a fresh connection
    pub fn join(&mut self, id: PlayerId, name: Option<&str>) -> Result<Player, LobbyError> {
        if self.connected_count() >= self.max_players {
            return Err(LobbyError::LobbyFull);
        }
        let display_name = sanitize_name(name)?;

        let player = Player::new(id, display_name);
        self.players.push(player.clone());
        Ok(player)
    }

    /// Remove a player entirely. A reconnect is a brand-new player.
    pub fn leave(&mut self, id: &str) -> Option<Player> {
        let pos = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Store an answer unless the player already answered this round
    pub fn mark_submitted(&mut self, id: &str, answer: RawAnswer) -> Result<&Player, LobbyError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LobbyError::NotInLobby)?;

        if player.has_submitted {
            return Err(LobbyError::AnswerRejected("already submitted"));
        }

        player.pending_answer = Some(answer.normalized());
        player.has_submitted = true;
        Ok(player)
    }

    pub fn mark_ready(&mut self, id: &str) -> Result<(), LobbyError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LobbyError::NotInLobby)?;
        player.ready = true;
        Ok(())
    }

    pub fn reset_for_round(&mut self) {
        for player in &mut self.players {
            player.reset_for_round();
        }
    }

    pub fn connected(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.connected)
    }

    pub fn all(&self) -> &[Player] {
        &self.players
    }

    pub fn connected_count(&self) -> usize {
        self.connected().count()
    }

    /// False for an empty lobby, so it never advances on its own
    pub fn all_connected_submitted(&self) -> bool {
        self.connected_count() > 0 && self.connected().all(|p| p.has_submitted)
    }

    /// False for an empty lobby, so it never advances on its own
    pub fn all_connected_ready(&self) -> bool {
        self.connected_count() > 0 && self.connected().all(|p| p.ready)
    }
}
