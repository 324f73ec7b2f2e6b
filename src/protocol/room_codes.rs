use crate::config::ProtocolConfig;
use rand::RngExt;

/// Generate a room code avoiding confusing characters (0, O, I, 1) with
/// configurable length. Codes are meant to be read aloud across a room.
pub fn generate_room_code_with_config(config: &ProtocolConfig) -> String {
    generate_room_code_of_length(config.room_code_length)
}

/// Generate a room code of the requested length.
pub fn generate_room_code_of_length(length: usize) -> String {
    const CLEAN_CHARS: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
    if length == 0 {
        return String::new();
    }
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CLEAN_CHARS.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CLEAN_CHARS[idx] as char;
            ch
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_has_configured_length() {
        let cfg = ProtocolConfig::default();
        let code = generate_room_code_with_config(&cfg);
        assert_eq!(code.len(), cfg.room_code_length);
    }

    #[test]
    fn test_code_is_uppercase_alphanumeric() {
        for _ in 0..100 {
            let code = generate_room_code_of_length(6);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
            assert_eq!(code, code.to_uppercase());
        }
    }

    #[test]
    fn test_code_avoids_confusing_characters() {
        for _ in 0..200 {
            let code = generate_room_code_of_length(8);
            for banned in ['0', 'O', 'I', '1'] {
                assert!(!code.contains(banned), "{code} contains {banned}");
            }
        }
    }

    #[test]
    fn test_zero_length_is_empty() {
        assert_eq!(generate_room_code_of_length(0), "");
    }
}
