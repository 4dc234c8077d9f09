//! Lobby error taxonomy
//!
//! Messages are user-facing (German, like the rest of the UI). Codes are the
//! stable identifiers clients switch on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("Lobby nicht gefunden.")]
    LobbyNotFound,

    #[error("Die Lobby ist bereits voll.")]
    LobbyFull,

    #[error("Ungültiger Name.")]
    InvalidName,

    #[error("Bitte gib einen gültigen 4-stelligen Code ein.")]
    InvalidCode,

    #[error("Du hast bereits abgestimmt.")]
    AlreadyVoted,

    #[error("Abstimmen ist gerade nicht möglich.")]
    VoteUnavailable,

    #[error("Antwort nicht angenommen: {0}")]
    AnswerRejected(&'static str),

    #[error("Du bist keiner Lobby beigetreten.")]
    NotInLobby,
}

impl LobbyError {
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::LobbyNotFound => "LOBBY_NOT_FOUND",
            LobbyError::LobbyFull => "LOBBY_FULL",
            LobbyError::InvalidName => "INVALID_NAME",
            LobbyError::InvalidCode => "INVALID_CODE",
            LobbyError::AlreadyVoted => "ALREADY_VOTED",
            LobbyError::VoteUnavailable => "VOTE_UNAVAILABLE",
            LobbyError::AnswerRejected(_) => "ANSWER_REJECTED",
            LobbyError::NotInLobby => "NOT_IN_LOBBY",
        }
    }
}

/// Structured failure sent back to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorInfo {
    pub code: String,
    pub msg: String,
}

impl From<&LobbyError> for ErrorInfo {
    fn from(e: &LobbyError) -> Self {
        Self {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_carries_code_and_message() {
        let info = ErrorInfo::from(&LobbyError::LobbyFull);
        assert_eq!(info.code, "LOBBY_FULL");
        assert_eq!(info.msg, "Die Lobby ist bereits voll.");
    }
}
