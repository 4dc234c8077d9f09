use super::lobby::Lobby;
use crate::error::LobbyError;
use crate::protocol::{EndVoteInfo, VoterInfo};
use crate::types::*;

impl Lobby {
    fn voting_open(&self) -> bool {
        self.settings.mode == GameMode::Unlimited && !self.is_finished()
    }

    /// Vote to end an unlimited game. Once every connected player has voted
    /// the game is finalized.
    pub fn vote_end_game(&mut self, id: &str) -> Result<(), LobbyError> {
        if !self.voting_open() {
            return Err(LobbyError::VoteUnavailable);
        }
        if !self.players.contains(id) {
            return Err(LobbyError::NotInLobby);
        }
        if self.end_votes.iter().any(|v| v == id) {
            return Err(LobbyError::AlreadyVoted);
        }

        self.end_votes.push(id.to_string());
        tracing::info!(
            "Lobby {}: end vote {}/{}",
            self.code,
            self.end_votes.len(),
            self.players.connected_count()
        );

        if !self.check_vote_quorum() {
            self.broadcast_lobby();
        }
        Ok(())
    }

    /// Finalize if the end vote has reached every connected player.
    /// Returns true if the game was finished.
    pub(super) fn check_vote_quorum(&mut self) -> bool {
        let connected = self.players.connected_count();
        if self.voting_open()
            && connected > 0
            && !self.end_votes.is_empty()
            && self.end_votes.len() >= connected
        {
            self.finalize(FinishReason::Vote);
            true
        } else {
            false
        }
    }

    pub(super) fn end_vote_info(&self) -> Option<EndVoteInfo> {
        if !self.voting_open() {
            return None;
        }

        let voters = self
            .end_votes
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| VoterInfo {
                id: p.id.clone(),
                name: p.display_name.clone(),
            })
            .collect();

        Some(EndVoteInfo {
            count: self.end_votes.len(),
            required: self.players.connected_count(),
            voters,
        })
    }
}
