//! Settings structures with compiled defaults.

use serde::{Deserialize, Serialize};

/// Top-level settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PreceptSettings {
    /// Database location and pool tuning.
    pub database: DatabaseSettings,
    /// Change-event fan-out tuning.
    pub events: EventSettings,
}

/// Database settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum connections in the pool.
    pub pool_size: u32,
    /// Writer wait budget on a locked database, in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "precept.db".into(),
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Change-notifier settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EventSettings {
    /// Per-channel broadcast buffer size. A subscriber further behind than
    /// this observes a lag error and must re-fetch state.
    pub channel_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
