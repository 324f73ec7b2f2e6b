use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{
    GamePhase, LeaderboardEntry, ParticipantInfo, PowerUp, QuestionView, RoomCloseReason,
    TeamStanding,
};
use crate::quiz::QuizData;

/// Message types sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Join the room as a scoring player (MUST precede ANSWER/USE_POWER_UP)
    Join {
        nickname: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<String>,
    },
    /// Submit an answer for the current question
    Answer { answer_index: usize },
    /// Consume a one-shot power-up before answering
    UsePowerUp { power_up: PowerUp },
    /// Organizer: begin the quiz
    StartGame,
    /// Organizer: advance to the next question (or the podium)
    NextQuestion,
    /// Organizer: jump straight to the podium
    EndQuiz,
    /// Organizer: reset the room for another round
    ResetRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quiz_data: Option<QuizData>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_limit_seconds: Option<u64>,
    },
}

/// Payload for `JOINED_ROOM` and `RECONNECTED`.
/// Boxed in `ServerMessage` to reduce enum size.
///
/// Carries everything a client needs to render the room it just entered,
/// including the live question projection when one is in flight, so a
/// mid-game joiner or reconnector resynchronizes from this single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSyncPayload {
    pub room_code: String,
    /// Absent for spectator sync frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// 1-based number of the current question, when one is defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<usize>,
    pub total_questions: usize,
    pub score: u32,
    pub streak: u32,
    pub participants: Vec<ParticipantInfo>,
    pub player_count: usize,
    /// Live question projection, present while a question is being shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// Whole seconds left on the live question, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_seconds: Option<u64>,
}

/// Payload for `ORGANIZER_RECONNECTED`.
/// Boxed in `ServerMessage` to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerSyncPayload {
    pub room_code: String,
    pub quiz_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<usize>,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_seconds: Option<u64>,
    /// Answers recorded for the current question.
    pub answered: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub participants: Vec<ParticipantInfo>,
    pub player_count: usize,
}

/// Payload for `QUESTION_OVER`.
/// Boxed in `ServerMessage` to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOverPayload {
    pub correct_index: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// True when this was the last question of the quiz.
    pub is_final: bool,
}

/// Payload for `PODIUM`.
/// Boxed in `ServerMessage` to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodiumPayload {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub team_leaderboard: Vec<TeamStanding>,
}

/// Message types sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Successfully joined as a new participant (boxed to reduce enum size)
    JoinedRoom(Box<JoinSyncPayload>),
    /// Rejoined under an existing nickname; score and streak preserved
    Reconnected(Box<JoinSyncPayload>),
    /// Another participant joined the room
    PlayerJoined {
        nickname: String,
        participants: Vec<ParticipantInfo>,
        player_count: usize,
    },
    /// A participant was removed from the room
    PlayerLeft {
        nickname: String,
        participants: Vec<ParticipantInfo>,
        player_count: usize,
    },
    /// A participant's connection dropped (record kept for reconnection)
    PlayerDisconnected {
        nickname: String,
        participants: Vec<ParticipantInfo>,
        player_count: usize,
    },
    /// A previously disconnected participant is back
    PlayerReconnected {
        nickname: String,
        participants: Vec<ParticipantInfo>,
        player_count: usize,
    },
    /// The organizer started the quiz
    GameStarting,
    /// A question is live (boxed to reduce enum size).
    /// The correct index is never part of this payload.
    Question(Box<QuestionView>),
    /// Once-per-second countdown; the final tick carries 0
    Timer { remaining: u64 },
    /// Private outcome of the player's own answer
    AnswerResult {
        correct: bool,
        points: u32,
        /// The player's multiplier as it was applied (for "x2" rendering).
        multiplier: f64,
        streak: u32,
    },
    /// Running answer tally, for the organizer and spectators
    AnswerCount { answered: usize },
    /// Private confirmation of a consumed power-up
    PowerUpActivated {
        power_up: PowerUp,
        /// For fifty-fifty: the two incorrect option indices to hide.
        #[serde(skip_serializing_if = "Option::is_none")]
        remove_indices: Option<Vec<usize>>,
    },
    /// Answers closed; correct option and standings (boxed to reduce enum size)
    QuestionOver(Box<QuestionOverPayload>),
    /// Final standings (boxed to reduce enum size)
    Podium(Box<PodiumPayload>),
    /// Room reset to the lobby for another round
    RoomReset {
        participants: Vec<ParticipantInfo>,
        player_count: usize,
    },
    /// The organizer's connection dropped; a grace window is open
    OrganizerDisconnected,
    /// The organizer is back (broadcast to players and spectators)
    HostReconnected,
    /// Full state projection for the organizer's own resynchronization
    /// (boxed to reduce enum size)
    OrganizerReconnected(Box<OrganizerSyncPayload>),
    /// The room is gone; no further events will follow
    RoomClosed { reason: RoomCloseReason },
    /// This connection was displaced by a newer one with the same nickname
    Kicked,
    /// Error message
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl ServerMessage {
    /// Builds an `Error` from a wire code, using its canonical description.
    pub fn error(code: ErrorCode) -> Self {
        Self::Error {
            message: code.description().to_string(),
            error_code: Some(code),
        }
    }
}

/// The envelope every outbound event travels in.
///
/// `phase` is the room phase the event was generated in, stamped by the
/// room task at publish time. The message itself is flattened, so the
/// wire shape is `{"phase": ..., "type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub phase: GamePhase,
    #[serde(flatten)]
    pub event: ServerMessage,
}

impl EventFrame {
    pub fn new(phase: GamePhase, event: ServerMessage) -> Self {
        Self { phase, event }
    }
}
