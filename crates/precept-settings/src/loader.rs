//! Settings loading: defaults, file deep-merge, env overrides.
//!
//! 1. Start from [`PreceptSettings::default`].
//! 2. If the settings file exists, deep-merge its values over the defaults.
//! 3. Apply environment variable overrides (highest priority).
//!
//! Env overrides parse strictly: an out-of-range or malformed value is
//! ignored and the file/default value stands.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::PreceptSettings;

/// Resolve the default settings file path (`~/.precept/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".precept").join("settings.json")
}

/// Load settings from the default path with env overrides.
pub fn load_settings() -> Result<PreceptSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env overrides. A missing file
/// yields the defaults; a malformed file is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PreceptSettings> {
    let defaults = serde_json::to_value(PreceptSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "no settings file, using defaults");
        defaults
    };

    let mut settings: PreceptSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge. Objects merge per key; arrays and scalars are
/// replaced; nulls in the source are skipped so they cannot erase defaults.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut PreceptSettings) {
    if let Some(v) = read_env_string("PRECEPT_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read_env_u32("PRECEPT_POOL_SIZE", 1, 64) {
        settings.database.pool_size = v;
    }
    if let Some(v) = read_env_u32("PRECEPT_BUSY_TIMEOUT_MS", 100, 600_000) {
        settings.database.busy_timeout_ms = v;
    }
    if let Some(v) = read_env_usize("PRECEPT_EVENT_CAPACITY", 16, 65_536) {
        settings.events.channel_capacity = v;
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| (min..=max).contains(v))
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| (min..=max).contains(v))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
