use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authorization
    Unauthorized,

    // Validation
    InvalidNickname,
    InvalidAvatar,
    InvalidTeam,
    InvalidRoomCode,
    InvalidQuiz,
    MalformedFrame,
    FrameTooLarge,

    // Room / lifecycle
    RoomNotFound,
    RoomFull,
    RoomClosed,
    MaxRoomsReached,
    InvalidCommand,

    // Gameplay
    AlreadyAnswered,
    InvalidAnswerIndex,
    PowerUpUnavailable,

    // Server
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    ///
    /// These are the messages surfaced to clients in `ERROR` events and
    /// HTTP error bodies; they must stay actionable for end users.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unauthorized => {
                "Organizer role claimed without a valid organizer token."
            }
            Self::InvalidNickname => {
                "The nickname is invalid. Nicknames must be 1-20 characters and not blank."
            }
            Self::InvalidAvatar => "The avatar is too long.",
            Self::InvalidTeam => "The team name is too long.",
            Self::InvalidRoomCode => {
                "The room code is malformed. Room codes are short uppercase alphanumeric strings."
            }
            Self::InvalidQuiz => {
                "The quiz data is invalid. Each question needs 2 or 4 options and a correct index in range."
            }
            Self::MalformedFrame => {
                "The message could not be parsed. Frames must be JSON objects with a `type` field."
            }
            Self::FrameTooLarge => {
                "The message exceeds the maximum allowed frame size."
            }
            Self::RoomNotFound => {
                "The requested room could not be found. It may have been closed or the code is incorrect."
            }
            Self::RoomFull => {
                "The room has reached its maximum player capacity."
            }
            Self::RoomClosed => {
                "The room has been closed and no longer accepts connections."
            }
            Self::MaxRoomsReached => {
                "The server has reached its maximum number of concurrent rooms. Please try again later."
            }
            Self::InvalidCommand => {
                "The command is not valid in the room's current state or for your role."
            }
            Self::AlreadyAnswered => {
                "You have already answered this question. Only the first answer counts."
            }
            Self::InvalidAnswerIndex => {
                "The answer index is out of range for this question."
            }
            Self::PowerUpUnavailable => {
                "This power-up is not available: already used, used after answering, or not applicable."
            }
            Self::InternalError => {
                "An internal server error occurred. The room has been terminated."
            }
        }
    }

    /// Whether the connection should be closed after delivering this error.
    ///
    /// Per the propagation policy: admission denials and authorization
    /// failures terminate the connection; per-command errors keep it open.
    pub fn should_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::RoomNotFound
                | Self::RoomFull
                | Self::RoomClosed
                | Self::InternalError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Match the wire form (SCREAMING_SNAKE_CASE) for log/wire consistency
        let s = match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => s,
            _ => format!("{self:?}"),
        };
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::RoomNotFound).unwrap();
        assert_eq!(json, "\"ROOM_NOT_FOUND\"");
        let json = serde_json::to_string(&ErrorCode::PowerUpUnavailable).unwrap();
        assert_eq!(json, "\"POWER_UP_UNAVAILABLE\"");
    }

    #[test]
    fn test_display_matches_wire_form() {
        assert_eq!(ErrorCode::InvalidCommand.to_string(), "INVALID_COMMAND");
        assert_eq!(ErrorCode::FrameTooLarge.to_string(), "FRAME_TOO_LARGE");
    }

    #[test]
    fn test_disconnect_policy() {
        assert!(ErrorCode::Unauthorized.should_disconnect());
        assert!(ErrorCode::RoomFull.should_disconnect());
        assert!(!ErrorCode::InvalidCommand.should_disconnect());
        assert!(!ErrorCode::MalformedFrame.should_disconnect());
        assert!(!ErrorCode::AlreadyAnswered.should_disconnect());
    }

    #[test]
    fn test_descriptions_nonempty() {
        let codes = [
            ErrorCode::Unauthorized,
            ErrorCode::InvalidNickname,
            ErrorCode::InvalidQuiz,
            ErrorCode::MalformedFrame,
            ErrorCode::RoomNotFound,
            ErrorCode::RoomFull,
            ErrorCode::MaxRoomsReached,
            ErrorCode::InvalidCommand,
            ErrorCode::AlreadyAnswered,
            ErrorCode::PowerUpUnavailable,
            ErrorCode::InternalError,
        ];
        for code in codes {
            assert!(!code.description().is_empty(), "{code} lacks description");
        }
    }
}
