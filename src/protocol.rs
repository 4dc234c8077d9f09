use crate::error::ErrorInfo;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinLobby {
        code: String,
        #[serde(default)]
        name: Option<String>,
    },
    SubmitAnswer {
        answer: RawAnswer,
    },
    PlayerReady,
    /// Start the first round without waiting for everybody to be ready
    StartRound,
    VoteEndGame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        connection_id: PlayerId,
        server_now: String,
    },
    /// Reply to `join_lobby`, sent only to the joining connection
    JoinResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorInfo>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lobby: Option<Box<LobbySnapshot>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
    },
    /// Reply to `vote_end_game`, sent only to the voter
    VoteResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorInfo>,
    },
    LobbyUpdate {
        lobby: Box<LobbySnapshot>,
    },
    PlayersUpdate {
        players: Vec<PlayerInfo>,
    },
    RoundStarted {
        question: String,
        #[serde(rename = "type")]
        kind: QuestionType,
    },
    AnswerReceived {
        player_id: PlayerId,
        name: String,
    },
    RoundResults {
        result: RoundResult,
    },
    GameSummary {
        summary: GameSummary,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn join_failed(error: &crate::error::LobbyError) -> Self {
        ServerMessage::JoinResult {
            success: false,
            error: Some(error.into()),
            lobby: None,
            player_id: None,
        }
    }
}

/// Public player info (no pending answer, so nobody can peek)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub connected: bool,
    pub has_submitted: bool,
}

impl From<&Player> for PlayerInfo {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            name: p.display_name.clone(),
            ready: p.ready,
            connected: p.connected,
            has_submitted: p.has_submitted,
        }
    }
}

/// The question as shown while answers are collected (no correct answer)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionInfo {
    pub id: QuestionId,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
}

impl From<&Question> for QuestionInfo {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question: q.text.clone(),
            kind: q.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoterInfo {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndVoteInfo {
    pub count: usize,
    pub required: usize,
    pub voters: Vec<VoterInfo>,
}

/// Full lobby state, broadcast on every structural change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LobbySnapshot {
    pub code: LobbyCode,
    pub players: Vec<PlayerInfo>,
    pub status: LobbyStatus,
    pub current_question: Option<QuestionInfo>,
    pub last_results: Option<RoundResult>,
    pub settings: LobbySettings,
    pub rounds_played: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_vote: Option<EndVoteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<GameSummary>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t": "join_lobby", "code": "ABCD", "name": "Anna"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::JoinLobby { code, name: Some(name) } if code == "ABCD" && name == "Anna"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t": "submit_answer", "answer": "12,5"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SubmitAnswer { answer: RawAnswer::Text(s) } if s == "12,5"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t": "submit_answer", "answer": 12.5}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SubmitAnswer { answer: RawAnswer::Number(n) } if n == 12.5));

        let msg: ClientMessage = serde_json::from_str(r#"{"t": "vote_end_game"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::VoteEndGame));
    }

    #[test]
    fn test_server_message_tags() {
        let json = serde_json::to_value(ServerMessage::AnswerReceived {
            player_id: "p1".into(),
            name: "Anna".into(),
        })
        .unwrap();
        assert_eq!(json["t"], "answer_received");
        assert_eq!(json["name"], "Anna");

        let json = serde_json::to_value(ServerMessage::RoundStarted {
            question: "Wie alt wurde Goethe?".into(),
            kind: QuestionType::Number,
        })
        .unwrap();
        assert_eq!(json["t"], "round_started");
        assert_eq!(json["type"], "number");
    }
}
