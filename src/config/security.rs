//! Security configuration types.

use super::defaults::default_allowed_origins;
use serde::{Deserialize, Serialize};

/// Security configuration.
///
/// TLS termination and reverse proxying are deployment concerns; the only
/// security surface the core owns is the cross-origin policy for the
/// control plane and the WebSocket upgrade handshake.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Allowed origins (comma-separated, or "*" for any)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}
