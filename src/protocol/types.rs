use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default constants for validation (can be overridden by config)
#[allow(dead_code)]
pub const DEFAULT_MAX_NICKNAME_LENGTH: usize = 20;
#[allow(dead_code)]
pub const DEFAULT_MAX_AVATAR_LENGTH: usize = 8;
#[allow(dead_code)]
pub const DEFAULT_MAX_TEAM_LENGTH: usize = 20;
#[allow(dead_code)]
pub const DEFAULT_ROOM_CODE_LENGTH: usize = 6;

/// Server-side identity of a single WebSocket connection.
///
/// Distinct from the client-supplied label in the connect URL, which is
/// only used for logs. A participant may be served by many connection ids
/// over its lifetime (reconnects, takeovers) but at most one at a time.
pub type ConnectionId = Uuid;

/// Opaque secret proving organizer identity, handed out once at room
/// creation and required on the realtime connection.
pub type OrganizerToken = Uuid;

/// Lifecycle phase of a room.
///
/// Every outbound event carries the phase it was generated in (see
/// [`EventFrame`]), so clients never have to infer the server's state from
/// message ordering alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    /// Players joining, game not started.
    #[default]
    Lobby,
    /// Organizer pressed start; waiting for the first question.
    Intro,
    /// A question is live and accepting answers.
    Question,
    /// Answers closed; correct option and standings shown.
    Reveal,
    /// Final standings.
    Podium,
    /// Room torn down (TTL, organizer loss, or explicit close).
    Closed,
}

impl GamePhase {
    /// Phases in which a current question index is defined.
    pub fn has_question(self) -> bool {
        matches!(self, Self::Intro | Self::Question | Self::Reveal)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Lobby => "LOBBY",
            Self::Intro => "INTRO",
            Self::Question => "QUESTION",
            Self::Reveal => "REVEAL",
            Self::Podium => "PODIUM",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// One-shot per-player modifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PowerUp {
    /// Doubles the player's multiplier for the current question.
    DoublePoints,
    /// Hides two incorrect options on the player's screen.
    FiftyFifty,
}

impl std::fmt::Display for PowerUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DoublePoints => f.write_str("double_points"),
            Self::FiftyFifty => f.write_str("fifty_fifty"),
        }
    }
}

/// Why a room was closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomCloseReason {
    /// No activity for the configured TTL.
    TtlExpired,
    /// Organizer disconnected and the grace window elapsed.
    OrganizerLeft,
    /// Explicit close (admin eviction or process shutdown).
    Evicted,
    /// An internal invariant was violated; the room is terminated cleanly.
    InternalError,
}

/// Information about a participant, as shown in rosters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub nickname: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub connected: bool,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// One row of a leaderboard, derived on demand from the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub nickname: String,
    pub score: u32,
    /// 1-based position, score descending, nickname ascending as tiebreak.
    pub rank: usize,
    /// previous rank - new rank; positive means the player rose.
    pub rank_change: i64,
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

/// Aggregate standing of one team (sum of member scores).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamStanding {
    pub team: String,
    pub score: u32,
    pub members: usize,
}

/// The projection of a question sent to every audience.
///
/// The correct option index is never part of this view; it is only
/// revealed in `QUESTION_OVER`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    /// 1-based position within the quiz.
    pub question_number: usize,
    pub total_questions: usize,
    pub prompt: String,
    pub options: Vec<String>,
    pub time_limit_seconds: u64,
    pub is_bonus: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_phase_serializes_screaming_snake() {
        let json = serde_json::to_string(&GamePhase::Question).unwrap();
        assert_eq!(json, "\"QUESTION\"");
        let json = serde_json::to_string(&GamePhase::Lobby).unwrap();
        assert_eq!(json, "\"LOBBY\"");
    }

    #[test]
    fn test_game_phase_display_matches_wire_form() {
        for phase in [
            GamePhase::Lobby,
            GamePhase::Intro,
            GamePhase::Question,
            GamePhase::Reveal,
            GamePhase::Podium,
            GamePhase::Closed,
        ] {
            let wire = serde_json::to_string(&phase).unwrap();
            assert_eq!(wire, format!("\"{phase}\""));
        }
    }

    #[test]
    fn test_has_question_only_in_play_phases() {
        assert!(!GamePhase::Lobby.has_question());
        assert!(GamePhase::Intro.has_question());
        assert!(GamePhase::Question.has_question());
        assert!(GamePhase::Reveal.has_question());
        assert!(!GamePhase::Podium.has_question());
        assert!(!GamePhase::Closed.has_question());
    }

    #[test]
    fn test_power_up_serializes_snake_case() {
        let json = serde_json::to_string(&PowerUp::DoublePoints).unwrap();
        assert_eq!(json, "\"double_points\"");
        let decoded: PowerUp = serde_json::from_str("\"fifty_fifty\"").unwrap();
        assert_eq!(decoded, PowerUp::FiftyFifty);
    }

    #[test]
    fn test_leaderboard_entry_omits_null_team() {
        let entry = LeaderboardEntry {
            nickname: "ada".into(),
            score: 900,
            rank: 1,
            rank_change: 0,
            streak: 1,
            team: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("team").is_none());
    }
}
