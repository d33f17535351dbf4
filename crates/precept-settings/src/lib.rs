//! # precept-settings
//!
//! Runtime settings for precept deployments. Loading is a three-layer
//! merge: compiled defaults, then the user's JSON settings file, then
//! environment variable overrides.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::SettingsError;
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{DatabaseSettings, EventSettings, PreceptSettings};
