//! User-selectable audio devices and locales.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   devices()   ┌────────────────────┐
//! │ DeviceEnumerator │──────────────▶│                    │
//! └──────────────────┘               │ SettingsController │──▶ SettingsFile (INI)
//! ┌──────────────────┐   builtin()   │                    │
//! │  LocaleCatalog   │──────────────▶│                    │
//! └──────────────────┘               └─────────┬──────────┘
//!                                              │ mutates
//!                                              ▼
//!                                    ┌────────────────────┐
//!                                    │ SettingsVault      │ (SharedVault)
//!                                    └────────────────────┘
//! ```
//!
//! Invalid selections (index out of range, unknown locale code, unknown
//! device name in the file) are dropped without an error.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_settings::settings::{SettingsController, SettingsFile, StaticEnumerator};
//!
//! let enumerator = StaticEnumerator::new(["Microphone"], ["Speakers", "Headphones"]);
//! let controller = SettingsController::initialize(
//!     &enumerator,
//!     SettingsFile::new("settings.ini"),
//! );
//!
//! controller.set_output_device(1);
//! controller.set_ui_language("en_US");
//! controller.save_settings().unwrap();
//! ```

pub mod controller;
pub mod device;
pub mod locale;
pub mod store;
pub mod vault;

use std::path::PathBuf;

use thiserror::Error;

pub use controller::SettingsController;
pub use device::{
    Device, DeviceDescriptor, DeviceDirection, DeviceEnumerator, DeviceError, DeviceHandle,
    StaticEnumerator,
};
pub use locale::{LocaleCatalog, LocaleEntry};
pub use store::{SettingsFile, StoredSelections};
pub use vault::{SettingsVault, SharedVault};

// ---------------------------------------------------------------------------
// ListItem
// ---------------------------------------------------------------------------

/// Common view of entries the presentation layer shows in a list
/// (devices and locales).
pub trait ListItem {
    /// Text shown to the user.
    fn label(&self) -> String;
    /// Value persisted and used for lookups.
    fn key(&self) -> &str;
}

// ---------------------------------------------------------------------------
// SettingsError
// ---------------------------------------------------------------------------

/// Errors from reading or writing the selections file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings file {}: {message}", path.display())]
    Ini { path: PathBuf, message: String },
}
