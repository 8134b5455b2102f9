//! Mutable holder of the current device and locale selections.
//!
//! There is exactly one vault per application.  It is created by the
//! application root and handed to the [`SettingsController`] as a
//! [`SharedVault`]; other components that need to read the selections get a
//! clone of the same handle.
//!
//! [`SettingsController`]: super::SettingsController

use std::sync::{Arc, Mutex};

use super::device::Device;
use super::locale::LocaleEntry;

/// Shared vault handle: cheap to clone, safe to share across threads.
pub type SharedVault = Arc<Mutex<SettingsVault>>;

/// Device lists and the five current selections.
///
/// Invariant: every current selection points at an entry of the matching
/// device list or locale catalog.  The controller validates before it
/// assigns, so fields are only writable from inside the `settings` module.
#[derive(Debug)]
pub struct SettingsVault {
    pub(super) input_devices: Vec<Arc<Device>>,
    pub(super) output_devices: Vec<Arc<Device>>,
    pub(super) current_input: Option<Arc<Device>>,
    pub(super) current_output: Option<Arc<Device>>,
    pub(super) ui_locale: Arc<LocaleEntry>,
    pub(super) tts_locale: Arc<LocaleEntry>,
    pub(super) stt_locale: Arc<LocaleEntry>,
}

impl SettingsVault {
    /// An empty vault with every locale set to `default_locale`.
    pub fn new(default_locale: Arc<LocaleEntry>) -> Self {
        Self {
            input_devices: Vec::new(),
            output_devices: Vec::new(),
            current_input: None,
            current_output: None,
            ui_locale: Arc::clone(&default_locale),
            tts_locale: Arc::clone(&default_locale),
            stt_locale: default_locale,
        }
    }

    /// Wraps the vault in a [`SharedVault`].
    pub fn shared(self) -> SharedVault {
        Arc::new(Mutex::new(self))
    }

    pub fn input_devices(&self) -> &[Arc<Device>] {
        &self.input_devices
    }

    pub fn output_devices(&self) -> &[Arc<Device>] {
        &self.output_devices
    }

    pub fn current_input(&self) -> Option<&Arc<Device>> {
        self.current_input.as_ref()
    }

    pub fn current_output(&self) -> Option<&Arc<Device>> {
        self.current_output.as_ref()
    }

    pub fn ui_locale(&self) -> &Arc<LocaleEntry> {
        &self.ui_locale
    }

    pub fn tts_locale(&self) -> &Arc<LocaleEntry> {
        &self.tts_locale
    }

    pub fn stt_locale(&self) -> &Arc<LocaleEntry> {
        &self.stt_locale
    }
}

/// Position of `current` within `list`, compared by identity.
pub(super) fn device_position(list: &[Arc<Device>], current: Option<&Arc<Device>>) -> Option<usize> {
    let current = current?;
    list.iter().position(|d| Arc::ptr_eq(d, current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::device::{build_device_list, DeviceDescriptor};
    use crate::settings::LocaleCatalog;

    #[test]
    fn new_vault_uses_default_locale_everywhere() {
        let catalog = LocaleCatalog::builtin();
        let vault = SettingsVault::new(Arc::clone(catalog.default_locale()));

        assert_eq!(vault.ui_locale().code(), "ru_RU");
        assert_eq!(vault.tts_locale().code(), "ru_RU");
        assert_eq!(vault.stt_locale().code(), "ru_RU");
        assert!(vault.input_devices().is_empty());
        assert!(vault.current_output().is_none());
    }

    #[test]
    fn device_position_uses_identity() {
        let list = build_device_list(vec![
            DeviceDescriptor::detached("Twin"),
            DeviceDescriptor::detached("Twin"),
        ]);
        assert_eq!(device_position(&list, Some(&list[1])), Some(1));

        let stranger = Device::new(DeviceDescriptor::detached("Twin"), 0);
        assert_eq!(device_position(&list, Some(&stranger)), None);
        assert_eq!(device_position(&list, None), None);
    }
}
