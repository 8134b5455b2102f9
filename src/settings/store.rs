//! INI persistence of the user's selections.
//!
//! The file holds two sections:
//!
//! ```ini
//! [devices]
//! input=Built-in Microphone
//! output=Speakers
//!
//! [language]
//! ui=ru_RU
//! tts=ru_RU
//! stt=en_US
//! ```
//!
//! The five keys are addressed as `devices/input`, `devices/output`,
//! `language/ui`, `language/tts` and `language/stt`.  Any other sections or
//! keys already present are kept when the file is rewritten.

use std::path::{Path, PathBuf};

use ini::Ini;

use super::SettingsError;

const DEVICES: &str = "devices";
const LANGUAGE: &str = "language";

/// The five persisted values.  `None` means "not present in the file".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSelections {
    /// `devices/input`: input device display name.
    pub input_device: Option<String>,
    /// `devices/output`: output device display name.
    pub output_device: Option<String>,
    /// `language/ui`: locale code.
    pub ui_language: Option<String>,
    /// `language/tts`: locale code.
    pub tts_language: Option<String>,
    /// `language/stt`: locale code.
    pub stt_language: Option<String>,
}

/// An INI file holding [`StoredSelections`].
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file.  A missing file yields empty selections.
    pub fn load(&self) -> Result<StoredSelections, SettingsError> {
        let Some(ini) = self.read()? else {
            log::debug!("settings file {} not found", self.path.display());
            return Ok(StoredSelections::default());
        };

        let get = |section: &str, key: &str| ini.get_from(Some(section), key).map(str::to_owned);

        Ok(StoredSelections {
            input_device: get(DEVICES, "input"),
            output_device: get(DEVICES, "output"),
            ui_language: get(LANGUAGE, "ui"),
            tts_language: get(LANGUAGE, "tts"),
            stt_language: get(LANGUAGE, "stt"),
        })
    }

    /// Writes every `Some` field, overwriting prior values and keeping
    /// unrelated content.  Parent directories are created as needed.
    pub fn save(&self, selections: &StoredSelections) -> Result<(), SettingsError> {
        let mut ini = self.read()?.unwrap_or_default();

        let entries = [
            (DEVICES, "input", &selections.input_device),
            (DEVICES, "output", &selections.output_device),
            (LANGUAGE, "ui", &selections.ui_language),
            (LANGUAGE, "tts", &selections.tts_language),
            (LANGUAGE, "stt", &selections.stt_language),
        ];
        for (section, key, value) in entries {
            if let Some(value) = value {
                ini.with_section(Some(section)).set(key, value.as_str());
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ini.write_to_file(&self.path)?;
        log::debug!("settings written to {}", self.path.display());
        Ok(())
    }

    fn read(&self) -> Result<Option<Ini>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ini::load_from_file(&self.path)
            .map(Some)
            .map_err(|e| SettingsError::Ini {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
