use crate::config::ProtocolConfig;

/// Validates and normalizes a nickname: trimmed, 1..=max code points,
/// never blank. Returns the trimmed form the registry should store.
pub fn validate_nickname_with_config(
    nickname: &str,
    config: &ProtocolConfig,
) -> Result<String, String> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        return Err("Nickname cannot be empty or whitespace".to_string());
    }
    let length = trimmed.chars().count();
    if length > config.max_nickname_length {
        return Err(format!(
            "Nickname too long (max {} characters)",
            config.max_nickname_length
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Nickname contains control characters".to_string());
    }
    Ok(trimmed.to_string())
}

/// Avatars are opaque short strings (typically a single emoji).
pub fn validate_avatar_with_config(avatar: &str, config: &ProtocolConfig) -> Result<(), String> {
    if avatar.chars().count() > config.max_avatar_length {
        return Err(format!(
            "Avatar too long (max {} characters)",
            config.max_avatar_length
        ));
    }
    Ok(())
}

/// Team tags are opaque short strings; empty after trim means "no team".
pub fn validate_team_with_config(team: &str, config: &ProtocolConfig) -> Result<(), String> {
    if team.chars().count() > config.max_team_length {
        return Err(format!(
            "Team name too long (max {} characters)",
            config.max_team_length
        ));
    }
    Ok(())
}

pub fn validate_room_code_with_config(code: &str, config: &ProtocolConfig) -> Result<(), String> {
    if code.is_empty() {
        return Err("Room code cannot be empty".to_string());
    }
    if code.len() != config.room_code_length {
        return Err(format!(
            "Room code must be exactly {} characters",
            config.room_code_length
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Room code must be alphanumeric".to_string());
    }
    Ok(())
}
