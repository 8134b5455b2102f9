//! Text-to-speech.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌──────────────┐     ┌─────────────────────────┐
//! │   Tts    │────▶│ SpeechEngine │────▶│ SpeechPlatform (trait)  │
//! │ (names)  │     │ (ids, async) │     │  └─ EspeakPlatform      │
//! └──────────┘     └──────┬───────┘     └─────────────────────────┘
//!                         │ tell()
//!                         ▼
//!                  tokio poll task ──▶ SpeechEvent::Finished
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_settings::speech::{EspeakPlatform, SpeechEngine, Tts, DEFAULT_POLL_INTERVAL};
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform = Arc::new(EspeakPlatform::new("espeak-ng"));
//!     let engine = SpeechEngine::new(platform, DEFAULT_POLL_INTERVAL).unwrap();
//!     let tts = Tts::new(engine).unwrap();
//!
//!     let task = tts.tell("Hello").unwrap();
//!     task.wait().await;
//! }
//! ```

pub mod engine;
pub mod espeak;
pub mod facade;
pub mod platform;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{
    CancelHandle, SpeechEngine, SpeechError, SpeechEvent, SpeechOutcome, SpeechTask, DEFAULT_POLL_INTERVAL,
};
pub use espeak::EspeakPlatform;
pub use facade::Tts;
pub use platform::{PlatformError, RunState, SpeechPlatform, Voice};

#[cfg(test)]
pub use platform::MockPlatform;
