use super::player::PlayerRegistry;
use super::score::ScoreBoard;
use crate::error::LobbyError;
use crate::protocol::{LobbySnapshot, PlayerInfo, QuestionInfo, ServerMessage};
use crate::questions::QuestionSource;
use crate::types::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Capacity of each lobby's broadcast channel
const LOBBY_CHANNEL_CAPACITY: usize = 100;

/// Where the lobby is in its round cycle. `Finished` is terminal.
#[derive(Debug, Clone)]
pub enum RoundPhase {
    Waiting,
    Collecting { question: Question },
    Results,
    Finished,
}

impl RoundPhase {
    pub fn status(&self) -> LobbyStatus {
        match self {
            RoundPhase::Waiting => LobbyStatus::Waiting,
            RoundPhase::Collecting { .. } => LobbyStatus::Collecting,
            RoundPhase::Results => LobbyStatus::Results,
            RoundPhase::Finished => LobbyStatus::Finished,
        }
    }
}

/// Everything a connection needs after joining
#[derive(Debug)]
pub struct JoinedLobby {
    pub code: LobbyCode,
    pub player: Player,
    pub snapshot: LobbySnapshot,
    pub events: broadcast::Receiver<ServerMessage>,
}

/// One lobby's complete state. All mutation goes through `&mut self`, so the
/// owner's lock is the only synchronization a lobby needs.
#[derive(Debug)]
pub struct Lobby {
    pub(super) code: LobbyCode,
    pub(super) settings: LobbySettings,
    pub(super) created_at: String,
    pub(super) players: PlayerRegistry,
    pub(super) scoreboard: ScoreBoard,
    pub(super) phase: RoundPhase,
    pub(super) questions: Arc<QuestionSource>,
    pub(super) used_question_ids: HashSet<QuestionId>,
    pub(super) end_votes: Vec<PlayerId>,
    pub(super) rounds_played: u32,
    pub(super) last_result: Option<RoundResult>,
    pub(super) final_summary: Option<GameSummary>,
    tx: broadcast::Sender<ServerMessage>,
    closed: bool,
    empty_since: Option<Instant>,
}

impl Lobby {
    pub fn new(
        code: LobbyCode,
        settings: LobbySettings,
        questions: Arc<QuestionSource>,
        max_players: usize,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(LOBBY_CHANNEL_CAPACITY);
        Self {
            code,
            settings,
            created_at: chrono::Utc::now().to_rfc3339(),
            players: PlayerRegistry::new(max_players),
            scoreboard: ScoreBoard::new(),
            phase: RoundPhase::Waiting,
            questions,
            used_question_ids: HashSet::new(),
            end_votes: Vec::new(),
            rounds_played: 0,
            last_result: None,
            final_summary: None,
            tx,
            closed: false,
            empty_since: Some(Instant::now()),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn settings(&self) -> LobbySettings {
        self.settings
    }

    pub fn status(&self) -> LobbyStatus {
        self.phase.status()
    }

    pub fn phase(&self) -> &RoundPhase {
        &self.phase
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn last_result(&self) -> Option<&RoundResult> {
        self.last_result.as_ref()
    }

    pub fn final_summary(&self) -> Option<&GameSummary> {
        self.final_summary.as_ref()
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn scoreboard(&self) -> &ScoreBoard {
        &self.scoreboard
    }

    pub fn end_votes(&self) -> &[PlayerId] {
        &self.end_votes
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, RoundPhase::Finished)
    }

    /// Listen to everything broadcast to this lobby's members
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the lobby as disposed; joins that raced the disposal will fail
    pub(super) fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the lobby has had no players for at least `max_idle`
    pub fn idle_for(&self, max_idle: Duration) -> bool {
        self.empty_since
            .map(|since| since.elapsed() >= max_idle)
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        let current_question = match &self.phase {
            RoundPhase::Collecting { question } => Some(QuestionInfo::from(question)),
            _ => None,
        };

        LobbySnapshot {
            code: self.code.clone(),
            players: self.player_infos(),
            status: self.status(),
            current_question,
            last_results: self.last_result.clone(),
            settings: self.settings,
            rounds_played: self.rounds_played,
            end_vote: self.end_vote_info(),
            final_summary: self.final_summary.clone(),
            created_at: self.created_at.clone(),
        }
    }

    fn player_infos(&self) -> Vec<PlayerInfo> {
        self.players.all().iter().map(PlayerInfo::from).collect()
    }

    pub(super) fn broadcast(&self, msg: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.tx.send(msg);
    }

    pub(super) fn broadcast_lobby(&self) {
        self.broadcast(ServerMessage::LobbyUpdate {
            lobby: Box::new(self.snapshot()),
        });
    }

    pub(super) fn broadcast_players(&self) {
        self.broadcast(ServerMessage::PlayersUpdate {
            players: self.player_infos(),
        });
    }

    /// Seat a new connection in this lobby
    pub fn join(&mut self, id: PlayerId, name: Option<&str>) -> Result<JoinedLobby, LobbyError> {
        if self.closed {
            return Err(LobbyError::LobbyNotFound);
        }

        let player = self.players.join(id, name)?;
        self.scoreboard.register(&player.id, &player.display_name);
        self.empty_since = None;

        tracing::info!(
            "Player {} ({}) joined lobby {}",
            player.display_name,
            player.id,
            self.code
        );

        let events = self.subscribe();
        self.broadcast_lobby();

        Ok(JoinedLobby {
            code: self.code.clone(),
            player,
            snapshot: self.snapshot(),
            events,
        })
    }

    /// Remove a player after a disconnect. Returns true if the lobby is now empty.
    ///
    /// The departure may complete the round (everybody left has answered) or
    /// the end vote, so both are re-checked here.
    pub fn leave(&mut self, id: &str) -> bool {
        let Some(player) = self.players.leave(id) else {
            return self.players.connected_count() == 0;
        };
        self.end_votes.retain(|v| v != id);

        tracing::info!(
            "Player {} ({}) left lobby {}",
            player.display_name,
            player.id,
            self.code
        );

        if self.players.connected_count() == 0 {
            self.empty_since = Some(Instant::now());
            return true;
        }

        let round_complete = matches!(self.phase, RoundPhase::Collecting { .. })
            && self.players.all_connected_submitted();
        if round_complete {
            self.evaluate_round();
        }

        // Votes of the remaining players may now be unanimous, even right after evaluation
        if !self.check_vote_quorum() && !round_complete {
            self.broadcast_lobby();
        }
        false
    }
}
