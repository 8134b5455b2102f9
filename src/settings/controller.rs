//! Getters and setters for the presentation layer, plus load/save.

use std::sync::{Arc, MutexGuard, PoisonError};

use super::device::{build_device_list, Device, DeviceDirection, DeviceEnumerator};
use super::locale::{LocaleCatalog, LocaleEntry};
use super::store::{SettingsFile, StoredSelections};
use super::vault::{device_position, SettingsVault, SharedVault};
use super::SettingsError;

/// Which of the three locale usages a call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleUsage {
    Ui,
    Stt,
    Tts,
}

/// Owns the locale catalog and the selections file; mutates the vault.
#[derive(Debug)]
pub struct SettingsController {
    vault: SharedVault,
    catalog: LocaleCatalog,
    file: SettingsFile,
}

impl SettingsController {
    /// Builds a fresh vault and initialises it, see [`Self::with_vault`].
    pub fn initialize(enumerator: &dyn DeviceEnumerator, file: SettingsFile) -> Self {
        let catalog = LocaleCatalog::builtin();
        let vault = SettingsVault::new(Arc::clone(catalog.default_locale())).shared();
        Self::setup(vault, catalog, enumerator, file)
    }

    /// Initialises `vault`:
    ///
    /// 1. every locale is reset to the catalog default (`ru_RU`) and any
    ///    previous device selection is cleared,
    /// 2. output then input devices are enumerated and the first of each
    ///    list becomes current,
    /// 3. persisted selections are loaded from `file`.
    ///
    /// Enumeration and load failures are logged and leave the defaults in
    /// place.
    pub fn with_vault(
        vault: SharedVault,
        enumerator: &dyn DeviceEnumerator,
        file: SettingsFile,
    ) -> Self {
        Self::setup(vault, LocaleCatalog::builtin(), enumerator, file)
    }

    fn setup(
        vault: SharedVault,
        catalog: LocaleCatalog,
        enumerator: &dyn DeviceEnumerator,
        file: SettingsFile,
    ) -> Self {
        let controller = Self {
            vault,
            catalog,
            file,
        };

        {
            let default = controller.catalog.default_locale();
            let mut vault = controller.lock();
            vault.ui_locale = Arc::clone(default);
            vault.tts_locale = Arc::clone(default);
            vault.stt_locale = Arc::clone(default);
            vault.current_input = None;
            vault.current_output = None;
        }

        controller.refresh_devices(enumerator);

        if let Err(e) = controller.load_settings() {
            log::warn!("Failed to load settings ({e}); using defaults");
        }

        controller
    }

    /// Another handle to the vault this controller mutates.
    pub fn shared_vault(&self) -> SharedVault {
        Arc::clone(&self.vault)
    }

    pub fn catalog(&self) -> &LocaleCatalog {
        &self.catalog
    }

    pub fn settings_file(&self) -> &SettingsFile {
        &self.file
    }

    fn lock(&self) -> MutexGuard<'_, SettingsVault> {
        self.vault.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Devices
    // -----------------------------------------------------------------------

    /// Re-enumerates both device lists.  A current device whose name is
    /// still present stays selected; otherwise the first device is taken.
    pub fn refresh_devices(&self, enumerator: &dyn DeviceEnumerator) {
        let outputs = enumerate(enumerator, DeviceDirection::Output);
        let inputs = enumerate(enumerator, DeviceDirection::Input);

        let mut vault = self.lock();
        vault.current_output = reselect(&outputs, vault.current_output.as_ref());
        vault.current_input = reselect(&inputs, vault.current_input.as_ref());
        vault.output_devices = outputs;
        vault.input_devices = inputs;

        log::debug!(
            "devices: {} output, {} input",
            vault.output_devices.len(),
            vault.input_devices.len()
        );
    }

    pub fn input_devices(&self) -> Vec<Arc<Device>> {
        self.lock().input_devices.clone()
    }

    pub fn output_devices(&self) -> Vec<Arc<Device>> {
        self.lock().output_devices.clone()
    }

    /// Selects the input device at `index`; out-of-range indices are ignored.
    pub fn set_input_device(&self, index: usize) {
        let mut vault = self.lock();
        if let Some(device) = vault.input_devices.get(index).cloned() {
            log::debug!("input device >> {}", device.name());
            vault.current_input = Some(device);
        }
    }

    /// Selects the output device at `index`; out-of-range indices are ignored.
    pub fn set_output_device(&self, index: usize) {
        let mut vault = self.lock();
        if let Some(device) = vault.output_devices.get(index).cloned() {
            log::debug!("output device >> {}", device.name());
            vault.current_output = Some(device);
        }
    }

    /// Position of the current input device, `None` when there is none.
    pub fn input_device(&self) -> Option<usize> {
        let vault = self.lock();
        device_position(&vault.input_devices, vault.current_input.as_ref())
    }

    /// Position of the current output device, `None` when there is none.
    pub fn output_device(&self) -> Option<usize> {
        let vault = self.lock();
        device_position(&vault.output_devices, vault.current_output.as_ref())
    }

    pub fn current_input_device(&self) -> Option<Arc<Device>> {
        self.lock().current_input.clone()
    }

    pub fn current_output_device(&self) -> Option<Arc<Device>> {
        self.lock().current_output.clone()
    }

    // -----------------------------------------------------------------------
    // Locales
    // -----------------------------------------------------------------------

    /// Usage-specific list of locales offered to the user.
    pub fn languages(&self, usage: LocaleUsage) -> Vec<Arc<LocaleEntry>> {
        self.list(usage).to_vec()
    }

    pub fn ui_languages(&self) -> Vec<Arc<LocaleEntry>> {
        self.languages(LocaleUsage::Ui)
    }

    pub fn stt_languages(&self) -> Vec<Arc<LocaleEntry>> {
        self.languages(LocaleUsage::Stt)
    }

    pub fn tts_languages(&self) -> Vec<Arc<LocaleEntry>> {
        self.languages(LocaleUsage::Tts)
    }

    /// Sets the locale for `usage` when `code` is a catalog key; unknown
    /// codes are ignored.
    ///
    /// The code only has to exist in the catalog, not in the usage list.
    pub fn set_language(&self, usage: LocaleUsage, code: &str) {
        let Some(entry) = self.catalog.get(code) else {
            return;
        };
        let entry = Arc::clone(entry);
        log::debug!("{usage:?} language >> {}", entry.code());

        let mut vault = self.lock();
        match usage {
            LocaleUsage::Ui => vault.ui_locale = entry,
            LocaleUsage::Stt => vault.stt_locale = entry,
            LocaleUsage::Tts => vault.tts_locale = entry,
        }
    }

    pub fn set_ui_language(&self, code: &str) {
        self.set_language(LocaleUsage::Ui, code)
    }

    pub fn set_stt_language(&self, code: &str) {
        self.set_language(LocaleUsage::Stt, code)
    }

    pub fn set_tts_language(&self, code: &str) {
        self.set_language(LocaleUsage::Tts, code)
    }

    /// Current locale for `usage`.
    pub fn current_locale(&self, usage: LocaleUsage) -> Arc<LocaleEntry> {
        let vault = self.lock();
        let entry = match usage {
            LocaleUsage::Ui => &vault.ui_locale,
            LocaleUsage::Stt => &vault.stt_locale,
            LocaleUsage::Tts => &vault.tts_locale,
        };
        Arc::clone(entry)
    }

    /// Position of the current locale within the usage list, `None` when
    /// the locale is not offered for that usage.
    pub fn language(&self, usage: LocaleUsage) -> Option<usize> {
        LocaleCatalog::position(self.list(usage), &self.current_locale(usage))
    }

    pub fn ui_language(&self) -> Option<usize> {
        self.language(LocaleUsage::Ui)
    }

    pub fn stt_language(&self) -> Option<usize> {
        self.language(LocaleUsage::Stt)
    }

    pub fn tts_language(&self) -> Option<usize> {
        self.language(LocaleUsage::Tts)
    }

    fn list(&self, usage: LocaleUsage) -> &[Arc<LocaleEntry>] {
        match usage {
            LocaleUsage::Ui => self.catalog.ui(),
            LocaleUsage::Stt => self.catalog.stt(),
            LocaleUsage::Tts => self.catalog.tts(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Applies the selections stored in the settings file.
    ///
    /// Devices are matched by exact name (first match in list order),
    /// locales by exact catalog key.  Values that match nothing are ignored.
    pub fn load_settings(&self) -> Result<(), SettingsError> {
        log::debug!("loading settings from {}", self.file.path().display());
        let stored = self.file.load()?;
        self.apply(&stored);
        Ok(())
    }

    /// Writes the five current selections to the settings file.
    pub fn save_settings(&self) -> Result<(), SettingsError> {
        log::debug!("saving settings to {}", self.file.path().display());
        self.file.save(&self.snapshot())
    }

    /// The current selections in their persisted form.
    pub fn snapshot(&self) -> StoredSelections {
        let vault = self.lock();
        StoredSelections {
            input_device: vault.current_input.as_ref().map(|d| d.name().to_owned()),
            output_device: vault.current_output.as_ref().map(|d| d.name().to_owned()),
            ui_language: Some(vault.ui_locale.code().to_owned()),
            tts_language: Some(vault.tts_locale.code().to_owned()),
            stt_language: Some(vault.stt_locale.code().to_owned()),
        }
    }

    fn apply(&self, stored: &StoredSelections) {
        {
            let mut vault = self.lock();
            let input = find_by_name(&vault.input_devices, stored.input_device.as_deref());
            let output = find_by_name(&vault.output_devices, stored.output_device.as_deref());
            if input.is_some() {
                vault.current_input = input;
            }
            if output.is_some() {
                vault.current_output = output;
            }
        }

        let locales = [
            (LocaleUsage::Ui, &stored.ui_language),
            (LocaleUsage::Tts, &stored.tts_language),
            (LocaleUsage::Stt, &stored.stt_language),
        ];
        for (usage, code) in locales {
            if let Some(code) = code {
                self.set_language(usage, code);
            }
        }
    }
}

fn enumerate(enumerator: &dyn DeviceEnumerator, direction: DeviceDirection) -> Vec<Arc<Device>> {
    match enumerator.devices(direction) {
        Ok(descriptors) => build_device_list(descriptors),
        Err(e) => {
            log::warn!("{e}; no {} devices available", direction.label());
            Vec::new()
        }
    }
}

fn find_by_name(list: &[Arc<Device>], name: Option<&str>) -> Option<Arc<Device>> {
    let name = name?;
    list.iter().find(|d| d.name() == name).cloned()
}

fn reselect(list: &[Arc<Device>], previous: Option<&Arc<Device>>) -> Option<Arc<Device>> {
    find_by_name(list, previous.map(|d| d.name())).or_else(|| list.first().cloned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
