//! Server assembly.
//!
//! [`GameServer`] is the shared state behind every HTTP and WebSocket
//! handler: the room directory plus the runtime slice of the config the
//! adapters need. Room state itself is never reachable from here --
//! everything goes through [`RoomHandle`]s.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::directory::{CreatedRoom, DirectoryError, RoomDirectory};
use crate::quiz::{QuizData, QuizSnapshot, QuizValidationError};
use crate::room::RoomHandle;

/// Runtime settings consumed by the connection adapters.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Per-subscriber bounded outbound queue depth.
    pub outbound_queue_size: usize,
    /// Transport ping cadence; two missed pongs drop the connection.
    pub heartbeat_interval: Duration,
    /// Maximum inbound frame size in bytes.
    pub max_frame_bytes: usize,
}

impl AdapterConfig {
    fn from_config(config: &Config) -> Self {
        Self {
            outbound_queue_size: config.server.outbound_queue_size.max(1),
            heartbeat_interval: Duration::from_secs(
                config.server.heartbeat_interval_seconds.max(1),
            ),
            max_frame_bytes: config.protocol.max_frame_bytes,
        }
    }
}

/// Shared application state.
pub struct GameServer {
    directory: Arc<RoomDirectory>,
    adapter_config: AdapterConfig,
    default_time_limit: Duration,
}

impl GameServer {
    pub fn new(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            directory: Arc::new(RoomDirectory::new(config)),
            adapter_config: AdapterConfig::from_config(config),
            default_time_limit: Duration::from_secs(config.server.default_time_limit_seconds),
        })
    }

    pub fn directory(&self) -> &Arc<RoomDirectory> {
        &self.directory
    }

    pub fn adapter_config(&self) -> &AdapterConfig {
        &self.adapter_config
    }

    /// Validates quiz data and creates a room for it.
    pub fn create_room(
        &self,
        quiz: QuizData,
        time_limit_seconds: Option<u64>,
    ) -> Result<CreatedRoom, CreateRoomError> {
        let snapshot = QuizSnapshot::from_data(quiz)?;
        let time_limit = match time_limit_seconds {
            Some(0) => return Err(CreateRoomError::InvalidTimeLimit),
            Some(seconds) => Duration::from_secs(seconds),
            None => self.default_time_limit,
        };
        let created = self.directory.create_room(Arc::new(snapshot), time_limit)?;
        Ok(created)
    }

    pub fn lookup_room(&self, code: &str) -> Option<RoomHandle> {
        self.directory.lookup(code)
    }

    pub fn health_check(&self) -> bool {
        true
    }

    pub fn room_count(&self) -> usize {
        self.directory.room_count()
    }
}

/// Typed failures from the room-creation control plane.
#[derive(Debug, thiserror::Error)]
pub enum CreateRoomError {
    #[error(transparent)]
    InvalidQuiz(#[from] QuizValidationError),

    #[error("time_limit_seconds must be greater than 0")]
    InvalidTimeLimit,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
