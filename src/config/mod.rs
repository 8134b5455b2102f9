//! Application configuration.
//!
//! Provides `AppConfig` (engine and storage options, TOML) and `AppPaths`
//! for cross-platform config directories. The user's device and language
//! selections are persisted separately, see [`crate::settings::SettingsFile`].

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioConfig, SettingsConfig, SpeechConfig};
