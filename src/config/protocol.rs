//! Protocol configuration types: wire limits and identifier rules.

use super::defaults::{
    default_max_avatar_length, default_max_frame_bytes, default_max_nickname_length,
    default_max_team_length, default_room_code_length,
};
use serde::{Deserialize, Serialize};

/// Protocol configuration for validation of client-supplied identifiers
/// and frames.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Length of generated room codes
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
    /// Maximum nickname length in code points (after trim)
    #[serde(default = "default_max_nickname_length")]
    pub max_nickname_length: usize,
    /// Maximum avatar length in code points
    #[serde(default = "default_max_avatar_length")]
    pub max_avatar_length: usize,
    /// Maximum team tag length in code points
    #[serde(default = "default_max_team_length")]
    pub max_team_length: usize,
    /// Maximum inbound WebSocket frame size in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            room_code_length: default_room_code_length(),
            max_nickname_length: default_max_nickname_length(),
            max_avatar_length: default_max_avatar_length(),
            max_team_length: default_max_team_length(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}
