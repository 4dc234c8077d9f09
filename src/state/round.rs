//! Round engine
//!
//! waiting -> collecting -> results -> collecting ... until the round limit or
//! an end vote moves the lobby to finished. Every transition broadcasts its
//! own notification followed by a fresh lobby snapshot.

use super::lobby::{Lobby, RoundPhase};
use crate::error::LobbyError;
use crate::protocol::ServerMessage;
use crate::types::*;

impl Lobby {
    fn limit_reached(&self) -> bool {
        match (self.settings.mode, self.settings.question_limit) {
            (GameMode::Fixed, Some(limit)) => self.rounds_played >= limit,
            _ => false,
        }
    }

    /// Begin the next round, or finish the game if the round limit is used up
    pub fn start_round(&mut self) {
        if !matches!(self.phase, RoundPhase::Waiting | RoundPhase::Results) {
            tracing::debug!(
                "Lobby {}: cannot start round in {:?}",
                self.code,
                self.status()
            );
            return;
        }

        if self.limit_reached() {
            self.finalize(FinishReason::Limit);
            return;
        }

        let question = self.questions.pick(&mut self.used_question_ids);
        self.players.reset_for_round();
        self.end_votes.clear();
        self.last_result = None;

        tracing::info!(
            "Lobby {}: round {} started with question {}",
            self.code,
            self.rounds_played + 1,
            question.id
        );

        self.broadcast(ServerMessage::RoundStarted {
            question: question.text.clone(),
            kind: question.kind,
        });
        self.phase = RoundPhase::Collecting { question };
        self.broadcast_lobby();
    }

    /// Explicit start request from a player; only kicks off the first round
    pub fn request_start(&mut self) {
        if matches!(self.phase, RoundPhase::Waiting) {
            self.start_round();
        } else {
            tracing::debug!(
                "Lobby {}: ignoring start request in {:?}",
                self.code,
                self.status()
            );
        }
    }

    /// Record a player's answer. The last missing answer triggers evaluation.
    ///
    /// Rejections are never shown to other players; the caller just logs them.
    pub fn submit_answer(&mut self, id: &str, answer: RawAnswer) -> Result<(), LobbyError> {
        if !matches!(self.phase, RoundPhase::Collecting { .. }) {
            return Err(LobbyError::AnswerRejected("round is not collecting answers"));
        }

        let player = self.players.mark_submitted(id, answer)?;
        let (player_id, name) = (player.id.clone(), player.display_name.clone());

        tracing::debug!("Lobby {}: answer received from {}", self.code, player_id);
        self.broadcast(ServerMessage::AnswerReceived { player_id, name });
        self.broadcast_players();

        if self.players.all_connected_submitted() {
            self.evaluate_round();
        }
        Ok(())
    }

    /// Close the current round. Finishes the game right away if that was the
    /// last round of a fixed-length game.
    pub fn evaluate_round(&mut self) {
        if !matches!(self.phase, RoundPhase::Collecting { .. }) {
            return;
        }

        self.evaluate();

        if self.limit_reached() {
            self.finalize(FinishReason::Limit);
        } else {
            self.broadcast_lobby();
        }
    }

    /// Score the collecting round and move to `Results`
    fn evaluate(&mut self) {
        let question = match std::mem::replace(&mut self.phase, RoundPhase::Results) {
            RoundPhase::Collecting { question } => question,
            other => {
                self.phase = other;
                return;
            }
        };

        let result = self.build_result(&question);
        self.scoreboard.record(&result.entries);
        self.rounds_played += 1;

        tracing::info!(
            "Lobby {}: round {} evaluated ({} answers)",
            self.code,
            self.rounds_played,
            result.entries.len()
        );

        self.last_result = Some(result.clone());
        self.broadcast(ServerMessage::RoundResults { result });
    }

    fn build_result(&self, question: &Question) -> RoundResult {
        let target = question.numeric_answer();

        let mut entries: Vec<ResultEntry> = self
            .players
            .connected()
            .map(|p| {
                let deviation = target.and_then(|t| {
                    let value = p.pending_answer.as_ref()?.as_number()?;
                    Some((value - t).abs())
                });
                ResultEntry {
                    player_id: p.id.clone(),
                    name: p.display_name.clone(),
                    answer: p.pending_answer.clone(),
                    deviation,
                    is_closest: false,
                    is_farthest: false,
                }
            })
            .collect();

        // First occurrence wins ties on both ends
        let mut closest: Option<(usize, f64)> = None;
        let mut farthest: Option<(usize, f64)> = None;
        for (i, deviation) in entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.deviation.map(|d| (i, d)))
        {
            if closest.map_or(true, |(_, best)| deviation < best) {
                closest = Some((i, deviation));
            }
            if farthest.map_or(true, |(_, worst)| deviation > worst) {
                farthest = Some((i, deviation));
            }
        }
        if let Some((i, _)) = closest {
            entries[i].is_closest = true;
        }
        if let Some((i, _)) = farthest {
            entries[i].is_farthest = true;
        }

        RoundResult {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            kind: question.kind,
            correct_answer: question.correct_answer.clone(),
            entries,
        }
    }

    /// Mark a player ready for the next round. Starts it once everybody is ready.
    pub fn player_ready(&mut self, id: &str) {
        if !matches!(self.phase, RoundPhase::Waiting | RoundPhase::Results) {
            tracing::debug!(
                "Lobby {}: ignoring ready from {} in {:?}",
                self.code,
                id,
                self.status()
            );
            return;
        }

        if let Err(e) = self.players.mark_ready(id) {
            tracing::debug!("Lobby {}: ready from {} ignored: {}", self.code, id, e);
            return;
        }
        self.broadcast_players();

        if self.players.all_connected_ready() {
            self.start_round();
        }
    }

    /// End the game. A round still collecting answers is evaluated first so
    /// no submitted answer is lost. Calling this on a finished game does nothing.
    pub fn finalize(&mut self, reason: FinishReason) {
        if self.is_finished() {
            return;
        }

        if matches!(self.phase, RoundPhase::Collecting { .. }) {
            self.evaluate();
        }

        self.phase = RoundPhase::Finished;
        self.end_votes.clear();

        let summary = GameSummary {
            reason,
            highscore: self.scoreboard.build_highscore(),
            rounds_played: self.rounds_played,
        };

        tracing::info!(
            "Lobby {}: game finished ({:?}) after {} rounds",
            self.code,
            reason,
            self.rounds_played
        );

        self.final_summary = Some(summary.clone());
        self.broadcast(ServerMessage::GameSummary { summary });
        self.broadcast_lobby();
    }
}
