//! The platform speech collaborator.
//!
//! [`SpeechPlatform`] is the narrow interface the [`SpeechEngine`] drives:
//! voice enumeration and selection, blocking speech, fire-and-forget speech
//! and a status query.  It is object-safe and `Send + Sync` so it can be held
//! as `Arc<dyn SpeechPlatform>` and polled from a tokio task.
//!
//! [`MockPlatform`] (available under `#[cfg(test)]`) is a scripted stub that
//! reports `Running` for a configurable number of polls and counts every call.
//!
//! [`SpeechEngine`]: super::SpeechEngine

use thiserror::Error;

// ---------------------------------------------------------------------------
// Voice / RunState
// ---------------------------------------------------------------------------

/// A synthetic speaking persona offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Stable platform identifier used for selection.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Language tag reported by the platform, when it reports one.
    pub language: Option<String>,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// `true` when the voice's language tag belongs to `language`
    /// (`"ru"` matches `"ru"` and `"ru-RU"`, case-insensitive).
    pub fn speaks(&self, language: &str) -> bool {
        self.language.as_deref().is_some_and(|tag| {
            let primary = tag.split(|c: char| c == '-' || c == '_').next().unwrap_or(tag);
            primary.eq_ignore_ascii_case(language)
        })
    }
}

/// Whether the platform is still rendering the last asynchronous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Done,
}

// ---------------------------------------------------------------------------
// PlatformError
// ---------------------------------------------------------------------------

/// Failures reported by a [`SpeechPlatform`].
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("speech platform I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{program}` exited unsuccessfully ({status})")]
    Command { program: String, status: String },

    #[error("speech platform unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// SpeechPlatform trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to a text-to-speech backend.
///
/// # Contract
///
/// - At most one asynchronous request is outstanding at a time; the engine
///   guarantees this.
/// - `status` reports on the most recent `speak_async` request and returns
///   `Done` when there is none.
pub trait SpeechPlatform: Send + Sync {
    /// Every installed voice, in platform order.
    fn voices(&self) -> Result<Vec<Voice>, PlatformError>;

    /// The voice the platform uses when none is selected.
    fn default_voice(&self) -> Result<Option<Voice>, PlatformError>;

    /// Makes `voice` the voice for subsequent requests.
    fn select_voice(&self, voice: &Voice) -> Result<(), PlatformError>;

    /// Speaks `text`, returning once the platform is done.
    fn speak_blocking(&self, text: &str) -> Result<(), PlatformError>;

    /// Starts speaking `text` and returns immediately.
    fn speak_async(&self, text: &str) -> Result<(), PlatformError>;

    /// State of the last asynchronous request.
    fn status(&self) -> Result<RunState, PlatformError>;

    /// Aborts the outstanding asynchronous request, if any.
    fn stop(&self) -> Result<(), PlatformError>;
}

// Compile-time assertion: Box<dyn SpeechPlatform> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechPlatform>) {}
};

// ---------------------------------------------------------------------------
// MockPlatform  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockPlatform;

#[cfg(test)]
mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Scripted platform.  Each asynchronous request stays `Running` for
    /// `polls_per_request` status queries, then reports `Done`.
    pub struct MockPlatform {
        voices: Vec<Voice>,
        default_voice: Option<Voice>,
        polls_per_request: usize,
        remaining_polls: AtomicUsize,
        selected: Mutex<Option<Voice>>,
        spoken: Mutex<Vec<String>>,
        async_requests: AtomicUsize,
        status_calls: AtomicUsize,
        stop_calls: AtomicUsize,
        fail_speak: bool,
    }

    impl MockPlatform {
        /// Two voices, the first one is the default.
        pub fn new(polls_per_request: usize) -> Self {
            let voices = vec![
                Voice::new("mock/ru", "Irina").with_language("ru-RU"),
                Voice::new("mock/en", "David").with_language("en-US"),
            ];
            Self::with_voices(voices, polls_per_request)
        }

        pub fn with_voices(voices: Vec<Voice>, polls_per_request: usize) -> Self {
            Self {
                default_voice: voices.first().cloned(),
                voices,
                polls_per_request,
                remaining_polls: AtomicUsize::new(0),
                selected: Mutex::new(None),
                spoken: Mutex::new(Vec::new()),
                async_requests: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
                fail_speak: false,
            }
        }

        /// A platform whose speak calls always fail.
        pub fn failing() -> Self {
            Self {
                fail_speak: true,
                ..Self::new(0)
            }
        }

        pub fn selected(&self) -> Option<Voice> {
            self.selected.lock().unwrap().clone()
        }

        pub fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }

        pub fn async_requests(&self) -> usize {
            self.async_requests.load(Ordering::SeqCst)
        }

        pub fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        pub fn stop_calls(&self) -> usize {
            self.stop_calls.load(Ordering::SeqCst)
        }

        fn record(&self, text: &str) -> Result<(), PlatformError> {
            if self.fail_speak {
                return Err(PlatformError::Unavailable("mock failure".into()));
            }
            self.spoken.lock().unwrap().push(text.to_owned());
            Ok(())
        }
    }

    impl SpeechPlatform for MockPlatform {
        fn voices(&self) -> Result<Vec<Voice>, PlatformError> {
            Ok(self.voices.clone())
        }

        fn default_voice(&self) -> Result<Option<Voice>, PlatformError> {
            Ok(self.default_voice.clone())
        }

        fn select_voice(&self, voice: &Voice) -> Result<(), PlatformError> {
            *self.selected.lock().unwrap() = Some(voice.clone());
            Ok(())
        }

        fn speak_blocking(&self, text: &str) -> Result<(), PlatformError> {
            self.record(text)
        }

        fn speak_async(&self, text: &str) -> Result<(), PlatformError> {
            self.record(text)?;
            self.async_requests.fetch_add(1, Ordering::SeqCst);
            self.remaining_polls
                .store(self.polls_per_request, Ordering::SeqCst);
            Ok(())
        }

        fn status(&self) -> Result<RunState, PlatformError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.remaining_polls.load(Ordering::SeqCst);
            if remaining == 0 {
                return Ok(RunState::Done);
            }
            self.remaining_polls.store(remaining - 1, Ordering::SeqCst);
            Ok(RunState::Running)
        }

        fn stop(&self) -> Result<(), PlatformError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.remaining_polls.store(0, Ordering::SeqCst);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
