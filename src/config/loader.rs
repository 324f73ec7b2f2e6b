//! Configuration loading.
//!
//! The effective config is a stack of JSON documents folded over the
//! compiled-in defaults. Later entries in the stack win, field by field,
//! so precedence from weakest to strongest is:
//!
//! 1. defaults compiled into the binary
//! 2. `config.json` next to the executable
//! 3. `config.json` in the working directory
//! 4. the file named by `QUIZDASH_CONFIG_PATH`
//! 5. JSON read from stdin when `QUIZDASH_CONFIG_STDIN` is truthy
//! 6. raw JSON in `QUIZDASH_CONFIG_JSON`
//! 7. single-field env overrides such as `QUIZDASH__SERVER__MAX_ROOMS=50`
//!
//! A source that is missing or unparseable is reported on stderr and
//! skipped; loading never fails. [`validate_config`] runs at the end in
//! warn-only mode here -- `main` validates again and turns errors into a
//! real exit code.

use super::validation::validate_config;
use super::Config;
use serde_json::{Map, Value};
use std::path::Path;

#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut document =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(Map::new()));

    for source in document_sources() {
        overlay(&mut document, source);
    }
    for (path, value) in env_overrides(std::env::vars()) {
        overlay(&mut document, nested(&path, value));
    }

    let config = match serde_json::from_value::<Config>(document) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Config does not match the expected shape ({err}); using defaults");
            defaults
        }
    };

    if let Err(err) = validate_config(&config) {
        eprintln!("Configuration validation error: {err}");
    }

    config
}

/// Collects the JSON documents to stack, weakest first.
fn document_sources() -> Vec<Value> {
    use std::io::Read;

    let mut sources = Vec::new();

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            sources.extend(read_json_file(&exe_dir.join("config.json")));
        }
    }

    sources.extend(read_json_file(Path::new("config.json")));

    if let Ok(path) = std::env::var("QUIZDASH_CONFIG_PATH") {
        sources.extend(read_json_file(Path::new(&path)));
    }

    let stdin_requested = std::env::var("QUIZDASH_CONFIG_STDIN").is_ok_and(|flag| {
        matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
    });
    if stdin_requested {
        let mut buffer = String::new();
        match std::io::stdin().read_to_string(&mut buffer) {
            Ok(_) => sources.extend(parse_document(&buffer, "stdin")),
            Err(err) => eprintln!("Could not read config from stdin: {err}"),
        }
    }

    if let Ok(raw) = std::env::var("QUIZDASH_CONFIG_JSON") {
        sources.extend(parse_document(&raw, "QUIZDASH_CONFIG_JSON"));
    }

    sources
}

fn read_json_file(path: &Path) -> Option<Value> {
    if path.as_os_str().is_empty() || !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_document(&contents, &path.display().to_string()),
        Err(err) => {
            eprintln!("Could not read config from {}: {err}", path.display());
            None
        }
    }
}

fn parse_document(raw: &str, origin: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Ignoring config from {origin}: {err}");
            None
        }
    }
}

/// Deep-merges `patch` into `base`. Objects merge key by key; everything
/// else (scalars, arrays, or an object landing on a non-object) replaces
/// the slot outright.
fn overlay(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                overlay(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Wraps `value` in objects along `path`, so `["server", "max_rooms"]`
/// becomes `{"server": {"max_rooms": value}}` -- ready to [`overlay`].
fn nested(path: &[String], value: Value) -> Value {
    path.iter().rev().fold(value, |inner, key| {
        let mut map = Map::new();
        map.insert(key.clone(), inner);
        Value::Object(map)
    })
}

/// Extracts `QUIZDASH__SECTION__FIELD=value` pairs from an environment
/// snapshot. Path segments are lowercased to match the config's field
/// names; keys with an empty path are ignored.
fn env_overrides(vars: impl Iterator<Item = (String, String)>) -> Vec<(Vec<String>, Value)> {
    vars.filter_map(|(key, raw)| {
        let path: Vec<String> = key
            .strip_prefix("QUIZDASH__")?
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if path.is_empty() {
            return None;
        }
        Some((path, env_value(&raw)))
    })
    .collect()
}

/// Env values are parsed as JSON where possible (`8080`, `true`, `"x"`),
/// with comma-separated values becoming arrays and anything else a string.
fn env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.contains(',') {
        return Value::Array(
            trimmed
                .split(',')
                .map(|item| scalar(item.trim()))
                .collect(),
        );
    }
    scalar(trimmed)
}

fn scalar(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overlay_merges_objects_field_by_field() {
        let mut base = json!({"server": {"max_rooms": 500, "room_ttl_seconds": 1800}});
        overlay(&mut base, json!({"server": {"max_rooms": 7}}));
        assert_eq!(base["server"]["max_rooms"], 7);
        assert_eq!(base["server"]["room_ttl_seconds"], 1800);
    }

    #[test]
    fn test_overlay_later_patch_wins() {
        let mut base = json!({"port": 3536});
        overlay(&mut base, json!({"port": 8080}));
        overlay(&mut base, json!({"port": 9090}));
        assert_eq!(base["port"], 9090);
    }

    #[test]
    fn test_overlay_replaces_mismatched_shapes() {
        let mut base = json!({"logging": "terse"});
        overlay(&mut base, json!({"logging": {"level": "debug"}}));
        assert_eq!(base["logging"]["level"], "debug");
    }

    #[test]
    fn test_nested_builds_a_patch_along_the_path() {
        let path = vec!["server".to_string(), "max_rooms".to_string()];
        assert_eq!(
            nested(&path, json!(9)),
            json!({"server": {"max_rooms": 9}})
        );
    }

    #[test]
    fn test_env_value_types() {
        assert_eq!(env_value("8080"), json!(8080));
        assert_eq!(env_value("true"), json!(true));
        assert_eq!(env_value("hello"), json!("hello"));
        assert_eq!(env_value(""), json!(""));
        assert_eq!(env_value("a, 2, false"), json!(["a", 2, false]));
    }

    #[test]
    fn test_env_overrides_filters_and_lowercases() {
        let vars = vec![
            ("QUIZDASH__SERVER__MAX_ROOMS".to_string(), "9".to_string()),
            ("QUIZDASH__PORT".to_string(), "8080".to_string()),
            ("QUIZDASH__".to_string(), "ignored".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let mut overrides = env_overrides(vars.into_iter());
        overrides.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            overrides,
            vec![
                (vec!["port".to_string()], json!(8080)),
                (
                    vec!["server".to_string(), "max_rooms".to_string()],
                    json!(9)
                ),
            ]
        );
    }

    #[test]
    fn test_env_override_applies_through_overlay() {
        let mut document = serde_json::to_value(Config::default()).unwrap();
        let overrides = env_overrides(
            vec![("QUIZDASH__SERVER__MAX_ROOMS".to_string(), "3".to_string())].into_iter(),
        );
        for (path, value) in overrides {
            overlay(&mut document, nested(&path, value));
        }
        let config: Config = serde_json::from_value(document).unwrap();
        assert_eq!(config.server.max_rooms, 3);
        assert_eq!(config.port, 3536);
    }
}
