//! The fixed catalog of supported locales.
//!
//! Every [`LocaleEntry`] is created once by [`LocaleCatalog::builtin`] and
//! shared as `Arc<LocaleEntry>` between the catalog map and the three usage
//! lists (UI, speech recognition, speech synthesis).  Positions are computed
//! by identity, so an entry that exists in the catalog but not in a usage
//! list has no position in that list.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::ListItem;

// ---------------------------------------------------------------------------
// LocaleEntry
// ---------------------------------------------------------------------------

/// A supported language/territory pair.
#[derive(Debug, PartialEq, Eq)]
pub struct LocaleEntry {
    code: String,
    language: &'static str,
    territory: &'static str,
    native_name: &'static str,
}

impl LocaleEntry {
    fn new(
        language: &'static str,
        territory: &'static str,
        native_name: &'static str,
    ) -> Arc<Self> {
        Arc::new(Self {
            code: format!("{language}_{territory}"),
            language,
            territory,
            native_name,
        })
    }

    /// Locale code in `language_TERRITORY` form, e.g. `"ru_RU"`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// ISO-639-1 language code, e.g. `"ru"`.
    pub fn language(&self) -> &str {
        self.language
    }

    /// ISO-3166 territory code, e.g. `"RU"`.
    pub fn territory(&self) -> &str {
        self.territory
    }

    /// Language name written in the language itself.
    pub fn native_name(&self) -> &str {
        self.native_name
    }
}

impl ListItem for LocaleEntry {
    fn label(&self) -> String {
        self.native_name.to_string()
    }

    fn key(&self) -> &str {
        &self.code
    }
}

// ---------------------------------------------------------------------------
// LocaleCatalog
// ---------------------------------------------------------------------------

/// All known locales, keyed by code, plus the per-usage lists.
#[derive(Debug, Clone)]
pub struct LocaleCatalog {
    by_code: BTreeMap<String, Arc<LocaleEntry>>,
    ui: Vec<Arc<LocaleEntry>>,
    stt: Vec<Arc<LocaleEntry>>,
    tts: Vec<Arc<LocaleEntry>>,
    default: Arc<LocaleEntry>,
}

impl LocaleCatalog {
    /// Builds the hard-coded catalog: Belarusian, Russian and English.
    ///
    /// | List | Entries                  |
    /// |------|--------------------------|
    /// | UI   | `be_BY`, `ru_RU`, `en_US` |
    /// | STT  | `ru_RU`, `en_US`          |
    /// | TTS  | `ru_RU`                   |
    ///
    /// Russian is the default for all three usages.
    pub fn builtin() -> Self {
        let be = LocaleEntry::new("be", "BY", "Беларуская");
        let ru = LocaleEntry::new("ru", "RU", "Русский");
        let en = LocaleEntry::new("en", "US", "English");

        let by_code = [&be, &ru, &en]
            .into_iter()
            .map(|entry| (entry.code.clone(), Arc::clone(entry)))
            .collect();

        Self {
            by_code,
            ui: vec![Arc::clone(&be), Arc::clone(&ru), Arc::clone(&en)],
            stt: vec![Arc::clone(&ru), Arc::clone(&en)],
            tts: vec![Arc::clone(&ru)],
            default: ru,
        }
    }

    /// Looks up an entry by exact code.
    pub fn get(&self, code: &str) -> Option<&Arc<LocaleEntry>> {
        self.by_code.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    /// Locales offered for the user interface.
    pub fn ui(&self) -> &[Arc<LocaleEntry>] {
        &self.ui
    }

    /// Locales offered for speech recognition.
    pub fn stt(&self) -> &[Arc<LocaleEntry>] {
        &self.stt
    }

    /// Locales offered for speech synthesis.
    pub fn tts(&self) -> &[Arc<LocaleEntry>] {
        &self.tts
    }

    /// Locale selected for every usage before any settings are loaded.
    pub fn default_locale(&self) -> &Arc<LocaleEntry> {
        &self.default
    }

    /// All catalog codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }

    /// Position of `entry` within `list`, compared by identity.
    pub fn position(list: &[Arc<LocaleEntry>], entry: &Arc<LocaleEntry>) -> Option<usize> {
        list.iter().position(|e| Arc::ptr_eq(e, entry))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
