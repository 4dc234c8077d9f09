use serde::{Deserialize, Deserializer, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type QuestionId = String;
pub type LobbyCode = String;

/// Fallback display name for players who join without one
pub const DEFAULT_PLAYER_NAME: &str = "Spieler";
/// Maximum display name length in characters (after trimming)
pub const MAX_NAME_CHARS: usize = 18;
/// Rounds played in fixed mode when the creator did not pick a count
pub const DEFAULT_QUESTION_LIMIT: u32 = 5;
pub const MIN_QUESTION_LIMIT: u32 = 1;
pub const MAX_QUESTION_LIMIT: u32 = 99;

// ========== Questions ==========

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Number,
    Text,
}

/// The expected answer of a question, as stored in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "deserialize_question_id")]
    pub id: QuestionId,
    #[serde(rename = "question")]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(rename = "answer", default)]
    pub correct_answer: Option<CorrectAnswer>,
}

impl Question {
    /// The numeric target for deviation scoring, if this question has one
    pub fn numeric_answer(&self) -> Option<f64> {
        match (&self.kind, &self.correct_answer) {
            (QuestionType::Number, Some(CorrectAnswer::Number(n))) if n.is_finite() => Some(*n),
            _ => None,
        }
    }
}

/// Catalog files use either numeric or string ids
fn deserialize_question_id<'de, D>(deserializer: D) -> Result<QuestionId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Int(i64),
        Text(String),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Int(n) => n.to_string(),
        IdRepr::Text(s) => s,
    })
}

// ========== Answers ==========

/// An answer as it arrived over the wire: clients may send text or a bare number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawAnswer {
    Number(f64),
    Text(String),
}

impl RawAnswer {
    /// Normalize for storage: text answers are trimmed
    pub fn normalized(self) -> Self {
        match self {
            RawAnswer::Text(s) => RawAnswer::Text(s.trim().to_string()),
            other => other,
        }
    }

    /// Parse the answer as a number.
    ///
    /// Text is trimmed and the first comma is read as the decimal separator,
    /// so "3,5" and "3.5" are the same answer. Empty text and non-finite
    /// values do not count as numbers.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RawAnswer::Number(n) => *n,
            RawAnswer::Text(s) => {
                let trimmed = s.trim();
                // Blank input is no answer, not a guess of 0
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.replacen(',', ".", 1).parse::<f64>().ok()?
            }
        };
        value.is_finite().then_some(value)
    }
}

// ========== Players ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub connected: bool,
    pub ready: bool,
    pub has_submitted: bool,
    pub pending_answer: Option<RawAnswer>,
}

impl Player {
    pub fn new(id: PlayerId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            connected: true,
            ready: false,
            has_submitted: false,
            pending_answer: None,
        }
    }

    /// Forget everything tied to the previous round
    pub fn reset_for_round(&mut self) {
        self.ready = false;
        self.has_submitted = false;
        self.pending_answer = None;
    }
}

/// Cumulative per-player statistics, kept for the whole lifetime of a lobby
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerStatistics {
    pub player_id: PlayerId,
    pub display_name: String,
    pub rounds_participated: u32,
    pub valid_answer_count: u32,
    pub total_deviation: f64,
    pub points: u32,
    pub last_deviation: Option<f64>,
    pub last_points_awarded: u32,
}

impl PlayerStatistics {
    pub fn new(player_id: PlayerId, display_name: String) -> Self {
        Self {
            player_id,
            display_name,
            rounds_participated: 0,
            valid_answer_count: 0,
            total_deviation: 0.0,
            points: 0,
            last_deviation: None,
            last_points_awarded: 0,
        }
    }

    pub fn average_deviation(&self) -> Option<f64> {
        (self.valid_answer_count > 0).then(|| self.total_deviation / self.valid_answer_count as f64)
    }
}

// ========== Rounds & results ==========

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub answer: Option<RawAnswer>,
    pub deviation: Option<f64>,
    pub is_closest: bool,
    pub is_farthest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResult {
    pub question_id: QuestionId,
    pub question_text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub correct_answer: Option<CorrectAnswer>,
    pub entries: Vec<ResultEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Vote,
    Limit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighscoreEntry {
    #[serde(flatten)]
    pub stats: PlayerStatistics,
    pub average_deviation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSummary {
    pub reason: FinishReason,
    pub highscore: Vec<HighscoreEntry>,
    pub rounds_played: u32,
}

// ========== Lobby ==========

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Fixed,
    Unlimited,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbySettings {
    pub mode: GameMode,
    pub question_limit: Option<u32>,
}

impl LobbySettings {
    /// Build settings from creator input.
    ///
    /// Fixed mode defaults to five rounds and clamps the count to 1..=99;
    /// unlimited mode never carries a limit.
    pub fn new(mode: GameMode, question_count: Option<i64>) -> Self {
        let question_limit = match mode {
            GameMode::Fixed => Some(
                question_count
                    .map(|n| n.clamp(MIN_QUESTION_LIMIT as i64, MAX_QUESTION_LIMIT as i64) as u32)
                    .unwrap_or(DEFAULT_QUESTION_LIMIT),
            ),
            GameMode::Unlimited => None,
        };
        Self {
            mode,
            question_limit,
        }
    }
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self::new(GameMode::Fixed, None)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LobbyStatus {
    Waiting,
    Collecting,
    Results,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer_accepts_comma_and_dot() {
        assert_eq!(RawAnswer::Text("3,5".into()).as_number(), Some(3.5));
        assert_eq!(RawAnswer::Text(" 3.5 ".into()).as_number(), Some(3.5));
        assert_eq!(RawAnswer::Number(42.0).as_number(), Some(42.0));
    }

    #[test]
    fn test_parse_answer_rejects_garbage() {
        assert_eq!(RawAnswer::Text("viele".into()).as_number(), None);
        assert_eq!(RawAnswer::Text("".into()).as_number(), None);
        assert_eq!(RawAnswer::Text("inf".into()).as_number(), None);
        assert_eq!(RawAnswer::Text("1,000,000".into()).as_number(), None);
    }

    #[test]
    fn test_settings_clamp_limit() {
        assert_eq!(LobbySettings::new(GameMode::Fixed, None).question_limit, Some(5));
        assert_eq!(LobbySettings::new(GameMode::Fixed, Some(0)).question_limit, Some(1));
        assert_eq!(LobbySettings::new(GameMode::Fixed, Some(500)).question_limit, Some(99));
        assert_eq!(LobbySettings::new(GameMode::Unlimited, Some(10)).question_limit, None);
    }

    #[test]
    fn test_question_deserializes_numeric_id() {
        let q: Question = serde_json::from_str(
            r#"{"id": 7, "question": "Wie hoch ist der Kölner Dom?", "type": "number", "answer": 157}"#,
        )
        .unwrap();
        assert_eq!(q.id, "7");
        assert_eq!(q.numeric_answer(), Some(157.0));

        let q: Question = serde_json::from_str(
            r#"{"id": "t1", "question": "Hauptstadt von Peru?", "type": "text", "answer": "Lima"}"#,
        )
        .unwrap();
        assert_eq!(q.kind, QuestionType::Text);
        assert_eq!(q.numeric_answer(), None);
    }
}
