//! Application config structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the text-to-speech engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// How often an outstanding asynchronous speech request is polled for
    /// completion, in milliseconds.
    pub poll_interval_ms: u64,
    /// Synthesizer program driven by [`crate::speech::EspeakPlatform`].
    pub program: String,
    /// Voice identifier to select at startup: `None` means the platform
    /// default voice.
    pub voice: Option<String>,
}

impl SpeechConfig {
    /// [`Self::poll_interval_ms`] as a [`Duration`], never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            program: "espeak-ng".into(),
            voice: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio device discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Query the audio host for devices at startup.  When `false` the device
    /// lists stay empty (headless machines, CI).
    pub enumerate_devices: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enumerate_devices: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SettingsConfig
// ---------------------------------------------------------------------------

/// Where the user's device/language selections are stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Explicit path of the INI selections file: `None` means
    /// [`AppPaths::settings_file`].
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Text-to-speech settings.
    pub speech: SpeechConfig,
    /// Audio device discovery settings.
    pub audio: AudioConfig,
    /// Selections file location.
    pub settings: SettingsConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `config.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved path of the INI selections file.
    pub fn settings_file(&self) -> PathBuf {
        self.settings
            .file
            .clone()
            .unwrap_or_else(|| AppPaths::new().settings_file)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");

        assert_eq!(config.speech.poll_interval_ms, 100);
        assert_eq!(config.speech.program, "espeak-ng");
        assert!(config.speech.voice.is_none());
        assert!(config.audio.enumerate_devices);
        assert!(config.settings.file.is_none());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.speech.poll_interval_ms = 250;
        cfg.speech.voice = Some("gmw/en-US".into());
        cfg.audio.enumerate_devices = false;
        cfg.settings.file = Some(dir.path().join("custom.ini"));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.speech.poll_interval_ms, 250);
        assert_eq!(loaded.speech.voice.as_deref(), Some("gmw/en-US"));
        assert!(!loaded.audio.enumerate_devices);
        assert_eq!(loaded.settings_file(), dir.path().join("custom.ini"));
    }

    /// Sections and keys left out of the file fall back to their defaults.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[speech]\npoll_interval_ms = 40\n").expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.speech.poll_interval_ms, 40);
        assert_eq!(loaded.speech.program, "espeak-ng");
        assert!(loaded.audio.enumerate_devices);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let mut cfg = SpeechConfig::default();
        cfg.poll_interval_ms = 0;
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
    }
}
