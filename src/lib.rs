//! Device, language and text-to-speech settings for a desktop voice
//! application.
//!
//! * [`settings`]: locale catalog, audio device lists, the settings vault
//!   and its controller, INI persistence.
//! * [`audio`]: device discovery through cpal.
//! * [`speech`]: speech engine and TTS facade over a platform synthesizer.
//! * [`config`]: application config (TOML) and paths.

pub mod audio;
pub mod config;
pub mod settings;
pub mod speech;
