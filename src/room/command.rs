//! Commands processed by the room task.
//!
//! Everything that can happen to a room -- a frame from a client, a socket
//! closing, a timer firing, a directory inquiry -- arrives as one
//! [`RoomCommand`] on the room's single mpsc channel. That single
//! serialized consumer is what lets the state machine run without locks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::protocol::{
    ClientMessage, ConnectionId, ErrorCode, EventFrame, GamePhase, OrganizerToken, RoomCloseReason,
};

/// Channel sender for delivering outbound event frames to one connection's
/// writer task.
pub type EventSender = mpsc::Sender<Arc<EventFrame>>;

/// Role a connection claims at upgrade time, from the URL parameters.
#[derive(Debug)]
pub enum ConnectRole {
    /// Requires the token handed out at room creation.
    Organizer { token: OrganizerToken },
    /// Scoring participant; identity is established later by `JOIN`.
    Player,
    /// Read-only observer.
    Spectator,
}

/// A new connection asking to be attached to the room.
#[derive(Debug)]
pub struct ConnectRequest {
    pub conn_id: ConnectionId,
    /// Client-supplied connection label from the URL, for logs only.
    pub label: String,
    pub role: ConnectRole,
    pub sender: EventSender,
    /// Resolved by the room task; `Err` means the adapter must close.
    pub reply: oneshot::Sender<Result<(), RoomError>>,
}

/// Which deadline fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Once-per-second countdown during a question.
    QuestionTick,
    /// The question's time limit elapsed.
    QuestionExpiry,
    /// The organizer-reconnect grace window elapsed.
    OrganizerGrace,
    /// Room inactivity TTL elapsed.
    RoomTtl,
}

/// A timer fire, stamped with the generation it was armed under.
///
/// The room task bumps its generation whenever it re-arms or cancels a
/// deadline; a fire whose generation does not match is stale and ignored.
#[derive(Debug, Clone, Copy)]
pub struct TimerEvent {
    pub generation: u64,
    pub kind: TimerKind,
}

/// Commands sent to a room task through its channel.
#[derive(Debug)]
pub enum RoomCommand {
    /// Attach a new connection (organizer, player, or spectator).
    Connect(ConnectRequest),

    /// A parsed frame from an attached connection.
    Client {
        conn_id: ConnectionId,
        message: ClientMessage,
    },

    /// A frame that failed to parse; the room answers with a typed error
    /// so the reply carries the phase it was generated in.
    Malformed {
        conn_id: ConnectionId,
        code: ErrorCode,
        detail: String,
    },

    /// The connection's socket closed (cleanly or not).
    Disconnected { conn_id: ConnectionId },

    /// A scheduled deadline fired.
    Timer(TimerEvent),

    /// Directory inquiry (sweep task, health endpoint).
    Status { reply: oneshot::Sender<RoomStatus> },

    /// Terminate the room.
    Close { reason: RoomCloseReason },
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct RoomStatus {
    pub phase: GamePhase,
    pub participant_count: usize,
    pub connected_players: usize,
    pub spectator_count: usize,
    pub has_organizer: bool,
    /// Time since the last state-changing command.
    pub idle: Duration,
}

/// Typed failures surfaced when attaching a connection to a room.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    #[error("room is closed")]
    Closed,

    #[error("organizer token is invalid")]
    Unauthorized,

    #[error("room task is not accepting commands")]
    Unavailable,
}

impl RoomError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Closed => ErrorCode::RoomClosed,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Unavailable => ErrorCode::InternalError,
        }
    }
}
