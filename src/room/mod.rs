//! Room subsystem: one isolated task per game session.
//!
//! A room owns its participant registry, event bus, timers, and phase;
//! the outside world (connection adapters, the directory, the sweep task)
//! talks to it exclusively through a [`RoomHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::{Config, ProtocolConfig};
use crate::protocol::{ClientMessage, ConnectionId, ErrorCode, OrganizerToken, RoomCloseReason};
use crate::quiz::QuizSnapshot;

mod actor;
pub mod bus;
pub mod clock;
pub mod command;
pub mod leaderboard;
pub mod registry;

pub use command::{
    ConnectRequest, ConnectRole, EventSender, RoomCommand, RoomError, RoomStatus, TimerEvent,
    TimerKind,
};

use actor::RoomActor;

/// Per-room slice of the server configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub room_ttl: Duration,
    pub organizer_grace: Duration,
    pub max_players: usize,
    pub command_queue_size: usize,
    pub protocol: ProtocolConfig,
}

impl RoomConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            room_ttl: Duration::from_secs(config.server.room_ttl_seconds),
            organizer_grace: Duration::from_secs(config.server.organizer_grace_seconds),
            max_players: config.server.max_players_per_room,
            command_queue_size: config.server.command_queue_size,
            protocol: config.protocol.clone(),
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Handle to a running room task. Cheap to clone -- the directory holds
/// one per room and every connection adapter clones it.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: Arc<str>,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Attaches a connection; `Err` from the reply means the adapter must
    /// deliver the matching error frame and close.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        label: String,
        role: ConnectRole,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Connect(ConnectRequest {
                conn_id,
                label,
                role,
                sender,
                reply: reply_tx,
            }))
            .await
            .map_err(|_| RoomError::Unavailable)?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Delivers a parsed client frame (fire-and-forget).
    pub async fn client_message(&self, conn_id: ConnectionId, message: ClientMessage) {
        let _ = self
            .sender
            .send(RoomCommand::Client { conn_id, message })
            .await;
    }

    /// Reports an unparseable frame so the room can answer with a typed
    /// error in the right phase.
    pub async fn malformed(&self, conn_id: ConnectionId, code: ErrorCode, detail: String) {
        let _ = self
            .sender
            .send(RoomCommand::Malformed {
                conn_id,
                code,
                detail,
            })
            .await;
    }

    /// Reports the connection's socket closing. Commands already enqueued
    /// from the same connection are processed first (same channel).
    pub async fn disconnected(&self, conn_id: ConnectionId) {
        let _ = self
            .sender
            .send(RoomCommand::Disconnected { conn_id })
            .await;
    }

    pub async fn status(&self) -> Result<RoomStatus, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Status { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn close(&self, reason: RoomCloseReason) {
        let _ = self.sender.send(RoomCommand::Close { reason }).await;
    }
}

/// Spawns a new room task and returns a handle to communicate with it.
pub fn spawn_room(
    code: String,
    quiz: Arc<QuizSnapshot>,
    time_limit: Duration,
    organizer_token: OrganizerToken,
    config: RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_queue_size.max(1));
    let handle = RoomHandle {
        code: Arc::from(code.as_str()),
        sender: tx.clone(),
    };

    let actor = RoomActor::new(code, quiz, time_limit, organizer_token, config, rx, tx);
    tokio::spawn(actor.run());

    handle
}
