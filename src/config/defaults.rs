//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's `#[serde(default = ...)]`
//! attributes throughout the configuration system. Functions are organized by category for
//! easier maintenance.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3536
}

// =============================================================================
// Server Defaults
// =============================================================================

/// Inactivity TTL for rooms (seconds).
pub const fn default_room_ttl_seconds() -> u64 {
    1800 // 30 minutes
}

/// Grace window for organizer reconnection after a drop (seconds).
pub const fn default_organizer_grace_seconds() -> u64 {
    60
}

/// Per-subscriber bounded outbound queue depth.
pub const fn default_outbound_queue_size() -> usize {
    64
}

/// Transport ping cadence (seconds).
pub const fn default_heartbeat_interval_seconds() -> u64 {
    15
}

pub const fn default_max_rooms() -> usize {
    500
}

pub const fn default_max_players_per_room() -> usize {
    100
}

/// Interval for the directory sweep that reaps closed rooms (seconds).
pub const fn default_room_sweep_interval_seconds() -> u64 {
    60
}

/// Question time limit when room creation does not specify one (seconds).
pub const fn default_time_limit_seconds() -> u64 {
    20
}

/// Capacity of each room's inbound command channel.
pub const fn default_command_queue_size() -> usize {
    256
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_room_code_length() -> usize {
    6
}

pub const fn default_max_nickname_length() -> usize {
    20
}

pub const fn default_max_avatar_length() -> usize {
    8
}

pub const fn default_max_team_length() -> usize {
    20
}

/// Maximum inbound WebSocket frame size in bytes.
pub const fn default_max_frame_bytes() -> usize {
    64 * 1024
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_allowed_origins() -> String {
    "*".to_string()
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}
