//! Configuration validation functions.

use super::Config;

/// Rejects configurations that would misbehave at runtime. Returns the
/// first problem found. The wildcard-origin check is the one spot where
/// severity depends on the environment: a warning while developing, a
/// hard error in production.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let server = &config.server;

    require_nonzero("server.room_ttl_seconds", server.room_ttl_seconds)?;
    require_nonzero(
        "server.heartbeat_interval_seconds",
        server.heartbeat_interval_seconds,
    )?;
    require_nonzero(
        "server.default_time_limit_seconds",
        server.default_time_limit_seconds,
    )?;
    require_nonzero("server.max_rooms", server.max_rooms as u64)?;
    require_nonzero(
        "server.max_players_per_room",
        server.max_players_per_room as u64,
    )?;

    if server.outbound_queue_size < 8 {
        anyhow::bail!(
            "server.outbound_queue_size is {}; below 8, an ordinary question fan-out plus a \
             few countdown ticks already overruns the queue and drops healthy subscribers",
            server.outbound_queue_size
        );
    }

    if server.organizer_grace_seconds < 30 {
        anyhow::bail!(
            "server.organizer_grace_seconds is {}; an organizer resuming a backgrounded phone \
             tab routinely needs 30 seconds, and a shorter window closes rooms mid-game",
            server.organizer_grace_seconds
        );
    }

    if !(4..=12).contains(&config.protocol.room_code_length) {
        anyhow::bail!(
            "protocol.room_code_length is {}; codes shorter than 4 collide, longer than 12 \
             stop being readable aloud",
            config.protocol.room_code_length
        );
    }

    if config.protocol.max_frame_bytes < 1024 {
        anyhow::bail!(
            "protocol.max_frame_bytes is {}; a JOIN frame with a long nickname and team \
             already needs more than that (minimum 1024)",
            config.protocol.max_frame_bytes
        );
    }

    if config.security.allowed_origins.trim() == "*" {
        if is_production_mode() {
            anyhow::bail!(
                "security.allowed_origins is \"*\" while running in production: any website \
                 could open sockets into your quiz rooms. List the client origins explicitly, \
                 e.g. QUIZDASH__SECURITY__ALLOWED_ORIGINS=https://quiz.example.com"
            );
        }
        eprintln!(
            "security.allowed_origins is \"*\" -- fine on a laptop, set explicit origins \
             before exposing the server"
        );
    }

    Ok(())
}

fn require_nonzero(field: &str, value: u64) -> anyhow::Result<()> {
    if value == 0 {
        anyhow::bail!("{field} must be greater than 0");
    }
    Ok(())
}

/// Production is signalled either by `QUIZDASH__ENVIRONMENT` being set to
/// `production`/`prod`, or by one of the conventional deployment flags
/// existing at all.
pub fn is_production_mode() -> bool {
    if let Ok(value) = std::env::var("QUIZDASH__ENVIRONMENT") {
        return matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "production" | "prod"
        );
    }

    ["QUIZDASH_PRODUCTION", "PRODUCTION", "PROD"]
        .iter()
        .any(|flag| std::env::var(flag).is_ok())
}
