//! Narrow text-to-speech interface for the presentation layer.
//!
//! [`Tts`] works with voice display names instead of platform identifiers.
//! The name → voice map is filled from the engine's voice list on
//! construction and on [`Tts::refresh_voices`]; when two voices share a
//! display name the first one in platform order wins.

use std::collections::HashMap;

use tokio::sync::broadcast;

use super::engine::{SpeechEngine, SpeechError, SpeechEvent, SpeechTask};
use super::platform::Voice;
use crate::settings::LocaleEntry;

const EVENT_CAPACITY: usize = 16;

pub struct Tts {
    engine: SpeechEngine,
    voices: Vec<Voice>,
    by_name: HashMap<String, usize>,
    events: broadcast::Sender<SpeechEvent>,
}

impl Tts {
    /// Wraps `engine` and loads its voice list.
    pub fn new(engine: SpeechEngine) -> Result<Self, SpeechError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut tts = Self {
            engine,
            voices: Vec::new(),
            by_name: HashMap::new(),
            events,
        };
        tts.refresh_voices()?;
        Ok(tts)
    }

    /// Re-reads the installed voices from the engine.
    pub fn refresh_voices(&mut self) -> Result<(), SpeechError> {
        let voices = self.engine.voices()?;
        let mut by_name = HashMap::with_capacity(voices.len());
        for (i, voice) in voices.iter().enumerate() {
            by_name.entry(voice.name.clone()).or_insert(i);
        }
        self.voices = voices;
        self.by_name = by_name;
        Ok(())
    }

    /// Display names of all voices, in platform order.
    pub fn voice_list(&self) -> Vec<String> {
        self.voices.iter().map(|v| v.name.clone()).collect()
    }

    /// Display name of the selected voice.
    pub fn current_voice(&self) -> Option<&str> {
        self.engine.voice().map(|v| v.name.as_str())
    }

    /// Selects the voice with display name `name`.
    ///
    /// Returns `Ok(false)` and leaves the voice unchanged when no voice has
    /// that name.
    pub fn set_voice(&mut self, name: &str) -> Result<bool, SpeechError> {
        let Some(&index) = self.by_name.get(name) else {
            log::warn!("unknown voice `{name}`; keeping current voice");
            return Ok(false);
        };
        let id = self.voices[index].id.clone();
        self.engine.set_voice(Some(&id))?;
        Ok(true)
    }

    /// Selects the first voice speaking the language of `locale`.
    ///
    /// Returns `Ok(false)` when no installed voice speaks it.
    pub fn set_voice_for_locale(&mut self, locale: &LocaleEntry) -> Result<bool, SpeechError> {
        let Some(voice) = self.voices.iter().find(|v| v.speaks(locale.language())) else {
            log::debug!("no voice for locale {}", locale.code());
            return Ok(false);
        };
        let id = voice.id.clone();
        self.engine.set_voice(Some(&id))?;
        Ok(true)
    }

    /// Selects the voice named `name` when given, otherwise the first voice
    /// for `fallback`.  With neither the current voice stays.
    ///
    /// Returns `Ok(false)` when the requested voice is not installed.
    pub fn choose_voice(
        &mut self,
        name: Option<&str>,
        fallback: Option<&LocaleEntry>,
    ) -> Result<bool, SpeechError> {
        match (name, fallback) {
            (Some(name), _) => self.set_voice(name),
            (None, Some(locale)) => self.set_voice_for_locale(locale),
            (None, None) => Ok(true),
        }
    }

    /// Speaks `text`, blocking until done.
    pub fn say(&self, text: &str) -> Result<(), SpeechError> {
        self.engine.say(text)
    }

    /// Starts speaking `text`; completion is raised on [`Self::subscribe`].
    pub fn tell(&self, text: &str) -> Result<SpeechTask, SpeechError> {
        let events = self.events.clone();
        self.engine.tell_with(text, move || {
            let _ = events.send(SpeechEvent::Finished);
        })
    }

    /// Receiver for this facade's `Finished` events.
    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.events.subscribe()
    }

    pub fn engine(&self) -> &SpeechEngine {
        &self.engine
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
