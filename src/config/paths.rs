//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (app config + persisted selections):
//!   Windows: %APPDATA%\voice-settings\
//!   macOS:   ~/Library/Application Support/voice-settings/
//!   Linux:   ~/.config/voice-settings/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `config.toml` and `settings.ini`.
    pub config_dir: PathBuf,
    /// Full path to `config.toml`.
    pub config_file: PathBuf,
    /// Full path to `settings.ini` (device and language selections).
    pub settings_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-settings";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let config_file = config_dir.join("config.toml");
        let settings_file = config_dir.join("settings.ini");

        Self {
            config_dir,
            config_file,
            settings_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
