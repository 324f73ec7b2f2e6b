//! Server behavior configuration types.

use super::defaults::{
    default_command_queue_size, default_heartbeat_interval_seconds, default_max_players_per_room,
    default_max_rooms, default_organizer_grace_seconds, default_outbound_queue_size,
    default_room_sweep_interval_seconds, default_room_ttl_seconds, default_time_limit_seconds,
};
use serde::{Deserialize, Serialize};

/// Server configuration for room lifecycle and fan-out.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Inactivity TTL for rooms (seconds)
    #[serde(default = "default_room_ttl_seconds")]
    pub room_ttl_seconds: u64,
    /// Grace window for organizer reconnection (seconds)
    #[serde(default = "default_organizer_grace_seconds")]
    pub organizer_grace_seconds: u64,
    /// Per-subscriber bounded outbound queue depth
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
    /// Transport ping cadence (seconds); 2 missed pongs drop the connection
    #[serde(default = "default_heartbeat_interval_seconds")]
    pub heartbeat_interval_seconds: u64,
    /// Maximum concurrent rooms; extra creates are rejected
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
    /// Maximum players per room; extra joins are rejected
    #[serde(default = "default_max_players_per_room")]
    pub max_players_per_room: usize,
    /// Interval for the sweep task that evicts closed rooms (seconds)
    #[serde(default = "default_room_sweep_interval_seconds")]
    pub room_sweep_interval_seconds: u64,
    /// Question time limit when room creation does not specify one (seconds)
    #[serde(default = "default_time_limit_seconds")]
    pub default_time_limit_seconds: u64,
    /// Capacity of each room's inbound command channel
    #[serde(default = "default_command_queue_size")]
    pub command_queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room_ttl_seconds: default_room_ttl_seconds(),
            organizer_grace_seconds: default_organizer_grace_seconds(),
            outbound_queue_size: default_outbound_queue_size(),
            heartbeat_interval_seconds: default_heartbeat_interval_seconds(),
            max_rooms: default_max_rooms(),
            max_players_per_room: default_max_players_per_room(),
            room_sweep_interval_seconds: default_room_sweep_interval_seconds(),
            default_time_limit_seconds: default_time_limit_seconds(),
            command_queue_size: default_command_queue_size(),
        }
    }
}
