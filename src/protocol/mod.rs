// Protocol module: message types, wire validation, and room codes

pub mod error_codes;
pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

// Re-export the wire vocabulary at the protocol root so call sites can
// use `crate::protocol::ServerMessage` etc.

pub use error_codes::ErrorCode;

pub use types::{
    ConnectionId, GamePhase, LeaderboardEntry, OrganizerToken, ParticipantInfo, PowerUp,
    QuestionView, RoomCloseReason, TeamStanding, DEFAULT_MAX_AVATAR_LENGTH,
    DEFAULT_MAX_NICKNAME_LENGTH, DEFAULT_MAX_TEAM_LENGTH, DEFAULT_ROOM_CODE_LENGTH,
};

pub use messages::{
    ClientMessage, EventFrame, JoinSyncPayload, OrganizerSyncPayload, PodiumPayload,
    QuestionOverPayload, ServerMessage,
};
