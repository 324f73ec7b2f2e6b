//! Process-wide room index.
//!
//! The only mutable structure shared across rooms. Maps room code to
//! [`RoomHandle`]; everything behind the handle is private to the room's
//! own task. A periodic sweep evicts rooms that have closed themselves
//! (TTL, organizer loss) or whose task has died.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::config::Config;
use crate::protocol::{room_codes, GamePhase, OrganizerToken, RoomCloseReason};
use crate::quiz::QuizSnapshot;
use crate::room::{spawn_room, RoomConfig, RoomHandle};

/// Attempts at finding an unused code before giving up. The code space
/// (32^6) dwarfs `max_rooms`, so hitting this means something is wrong.
const CODE_ATTEMPTS: usize = 32;

/// Result of creating a room.
#[derive(Debug, Clone)]
pub struct CreatedRoom {
    pub room_code: String,
    pub organizer_token: OrganizerToken,
}

/// Typed failures from room creation.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("server is at capacity ({limit} rooms)")]
    MaxRoomsReached { limit: usize },

    #[error("could not allocate an unused room code after {CODE_ATTEMPTS} attempts")]
    CodeSpaceExhausted,
}

/// Creates, indexes, and evicts rooms.
pub struct RoomDirectory {
    rooms: DashMap<String, RoomHandle>,
    room_config: RoomConfig,
    max_rooms: usize,
    sweep_interval: Duration,
    code_length: usize,
}

impl RoomDirectory {
    pub fn new(config: &Config) -> Self {
        Self {
            rooms: DashMap::new(),
            room_config: RoomConfig::from_config(config),
            max_rooms: config.server.max_rooms,
            sweep_interval: Duration::from_secs(config.server.room_sweep_interval_seconds),
            code_length: config.protocol.room_code_length,
        }
    }

    /// Creates a room with a fresh collision-checked code and a fresh
    /// organizer token. The token is returned exactly once, here.
    pub fn create_room(
        &self,
        quiz: Arc<QuizSnapshot>,
        time_limit: Duration,
    ) -> Result<CreatedRoom, DirectoryError> {
        if self.rooms.len() >= self.max_rooms {
            tracing::warn!(
                limit = self.max_rooms,
                "room creation rejected: server at capacity"
            );
            return Err(DirectoryError::MaxRoomsReached {
                limit: self.max_rooms,
            });
        }

        for _ in 0..CODE_ATTEMPTS {
            let code = room_codes::generate_room_code_of_length(self.code_length);
            let entry = self.rooms.entry(code.clone());
            match entry {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(vacant) => {
                    let organizer_token = uuid::Uuid::new_v4();
                    let handle = spawn_room(
                        code.clone(),
                        Arc::clone(&quiz),
                        time_limit,
                        organizer_token,
                        self.room_config.clone(),
                    );
                    vacant.insert(handle);
                    tracing::info!(
                        room_code = %code,
                        time_limit_seconds = time_limit.as_secs(),
                        rooms = self.rooms.len(),
                        "room created"
                    );
                    return Ok(CreatedRoom {
                        room_code: code,
                        organizer_token,
                    });
                }
            }
        }

        tracing::error!(
            code_length = self.code_length,
            rooms = self.rooms.len(),
            "room code allocation failed"
        );
        Err(DirectoryError::CodeSpaceExhausted)
    }

    /// Case-insensitive lookup (codes are generated uppercase; clients
    /// type them by hand).
    pub fn lookup(&self, code: &str) -> Option<RoomHandle> {
        self.rooms
            .get(&code.trim().to_uppercase())
            .map(|entry| entry.value().clone())
    }

    pub fn evict(&self, code: &str) -> bool {
        self.rooms.remove(code).is_some()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Runs forever; spawn once at startup. Asks each room for its status
    /// and evicts the closed and the dead. The authoritative TTL deadline
    /// lives in the room task itself; this loop only reaps the tombstones.
    pub async fn sweep_task(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    pub async fn sweep(&self) {
        let handles: Vec<RoomHandle> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut evicted = 0usize;
        for handle in handles {
            let closed = match handle.status().await {
                Ok(status) => status.phase == GamePhase::Closed,
                // Task gone; the handle is a dangling entry.
                Err(_) => true,
            };
            if closed && self.evict(handle.code()) {
                evicted += 1;
                tracing::debug!(room_code = %handle.code(), "room evicted");
            }
        }

        if evicted > 0 {
            tracing::info!(evicted, remaining = self.rooms.len(), "directory sweep");
        }
    }

    /// Closes every room (process shutdown).
    pub async fn close_all(&self) {
        let handles: Vec<RoomHandle> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handle in handles {
            handle.close(RoomCloseReason::Evicted).await;
        }
    }
}
