//! Speech engine over a [`SpeechPlatform`].
//!
//! # States
//!
//! ```text
//! Uninitialized ──set_voice──▶ Ready ──tell──▶ Speaking(async) ──done──▶ Ready
//!                              Ready ──say───▶ Speaking(blocking) ──────▶ Ready
//! ```
//!
//! `tell` starts fire-and-forget speech and spawns a tokio task that polls
//! the platform every `poll_interval`.  When the platform reports `Done` the
//! task clears the busy flag, runs the optional completion callback,
//! broadcasts one [`SpeechEvent::Finished`] and exits.  Only one `tell` may
//! be outstanding per engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, oneshot, Notify};
use tokio::time::MissedTickBehavior;

use super::platform::{PlatformError, RunState, SpeechPlatform, Voice};

/// Default completion poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const EVENT_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors raised by the speech engine and the TTS facade.
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    /// The platform voice could not be set up.  The engine is unusable.
    #[error("speech init error: {0}")]
    Init(String),

    /// A platform call failed or the engine was misused.  Recoverable.
    #[error("speech logic error: {0}")]
    Logic(String),
}

impl SpeechError {
    fn init(context: &str, e: PlatformError) -> Self {
        SpeechError::Init(format!("{context}: {e}"))
    }

    fn logic(context: &str, e: PlatformError) -> Self {
        SpeechError::Logic(format!("{context}: {e}"))
    }
}

// ---------------------------------------------------------------------------
// SpeechEvent / SpeechOutcome / SpeechTask
// ---------------------------------------------------------------------------

/// Broadcast to every [`SpeechEngine::subscribe`] receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    /// An asynchronous request ran to completion.
    Finished,
}

/// How an asynchronous request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The platform reported `Done`.
    Finished,
    /// [`SpeechTask::cancel`] was called or the engine was dropped.
    Cancelled,
    /// The status query failed; polling stopped.
    Failed(String),
}

/// Handle to an outstanding `tell` request.
#[derive(Debug)]
pub struct SpeechTask {
    outcome: oneshot::Receiver<SpeechOutcome>,
    cancel: Arc<Notify>,
}

impl SpeechTask {
    /// Stops the platform speech and the poll task.  No
    /// [`SpeechEvent::Finished`] is raised for a cancelled request.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// A handle that can cancel this request while [`Self::wait`] is
    /// pending elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    /// Waits for the request to end.
    pub async fn wait(self) -> SpeechOutcome {
        self.outcome.await.unwrap_or(SpeechOutcome::Cancelled)
    }
}

/// Cancels the [`SpeechTask`] it was taken from.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<Notify>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

/// Callback run once when an asynchronous request finishes.
pub type FinishedCallback = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// SpeechEngine
// ---------------------------------------------------------------------------

pub struct SpeechEngine {
    platform: Arc<dyn SpeechPlatform>,
    voice: Option<Voice>,
    poll_interval: Duration,
    awaiting: Arc<AtomicBool>,
    pending: Mutex<Option<Arc<Notify>>>,
    events: broadcast::Sender<SpeechEvent>,
}

impl std::fmt::Debug for SpeechEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechEngine")
            .field("voice", &self.voice)
            .field("poll_interval", &self.poll_interval)
            .field("speaking", &self.is_speaking())
            .finish_non_exhaustive()
    }
}

impl SpeechEngine {
    /// Creates an engine using the platform default voice.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Init`] when the platform has no default voice.
    pub fn new(platform: Arc<dyn SpeechPlatform>, poll_interval: Duration) -> Result<Self, SpeechError> {
        let mut engine = Self::uninitialized(platform, poll_interval);
        engine.set_voice(None)?;
        Ok(engine)
    }

    /// Creates an engine using the voice with identifier `voice_id`.
    pub fn with_voice(
        platform: Arc<dyn SpeechPlatform>,
        voice_id: &str,
        poll_interval: Duration,
    ) -> Result<Self, SpeechError> {
        let mut engine = Self::uninitialized(platform, poll_interval);
        engine.set_voice(Some(voice_id))?;
        Ok(engine)
    }

    fn uninitialized(platform: Arc<dyn SpeechPlatform>, poll_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            platform,
            voice: None,
            poll_interval,
            awaiting: Arc::new(AtomicBool::new(false)),
            pending: Mutex::new(None),
            events,
        }
    }

    /// Selects the platform voice.
    ///
    /// With `None` the platform default voice is adopted; with
    /// `Some(id)` the installed voice whose identifier equals `id` exactly.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Init`] when there is no default voice, no voice with
    /// the given identifier, or the platform fails.
    pub fn set_voice(&mut self, voice_id: Option<&str>) -> Result<(), SpeechError> {
        let voice = match voice_id {
            None => self
                .platform
                .default_voice()
                .map_err(|e| SpeechError::init("querying default voice", e))?
                .ok_or_else(|| SpeechError::Init("no default voice in system".into()))?,
            Some(id) => self
                .platform
                .voices()
                .map_err(|e| SpeechError::init("enumerating voices", e))?
                .into_iter()
                .find(|v| v.id == id)
                .ok_or_else(|| SpeechError::Init(format!("no voice with identifier `{id}`")))?,
        };

        self.platform
            .select_voice(&voice)
            .map_err(|e| SpeechError::init("selecting voice", e))?;
        log::debug!("voice >> {} ({})", voice.name, voice.id);
        self.voice = Some(voice);
        Ok(())
    }

    /// The selected voice.
    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Every installed voice, unfiltered.
    pub fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
        self.platform
            .voices()
            .map_err(|e| SpeechError::logic("enumerating voices", e))
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// `true` while a `tell` request is outstanding.
    pub fn is_speaking(&self) -> bool {
        self.awaiting.load(Ordering::SeqCst)
    }

    /// Receiver for [`SpeechEvent`]s raised by later requests.
    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.events.subscribe()
    }

    /// Speaks `text` and blocks until the platform is done.
    ///
    /// From async code call this through `tokio::task::spawn_blocking`.
    pub fn say(&self, text: &str) -> Result<(), SpeechError> {
        self.platform
            .speak_blocking(text)
            .map_err(|e| SpeechError::logic("speaking", e))
    }

    /// Starts speaking `text` without blocking.  See [`Self::tell_with`].
    pub fn tell(&self, text: &str) -> Result<SpeechTask, SpeechError> {
        self.start(text, None)
    }

    /// Starts speaking `text` without blocking; `on_finished` runs once
    /// when the platform is done.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Logic`] when a previous request is still outstanding
    /// (no new platform request is made), when there is no runtime, or when
    /// the platform rejects the request.
    pub fn tell_with<F>(&self, text: &str, on_finished: F) -> Result<SpeechTask, SpeechError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.start(text, Some(Box::new(on_finished)))
    }

    fn start(&self, text: &str, on_finished: Option<FinishedCallback>) -> Result<SpeechTask, SpeechError> {
        if self
            .awaiting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SpeechError::Logic("already waiting to finish speech".into()));
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.awaiting.store(false, Ordering::SeqCst);
                return Err(SpeechError::Logic(format!("no async runtime: {e}")));
            }
        };

        if let Err(e) = self.platform.speak_async(text) {
            self.awaiting.store(false, Ordering::SeqCst);
            return Err(SpeechError::logic("speaking", e));
        }

        let cancel = Arc::new(Notify::new());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&cancel));

        runtime.spawn(poll_until_done(
            Arc::clone(&self.platform),
            self.poll_interval,
            Arc::clone(&cancel),
            Arc::clone(&self.awaiting),
            self.events.clone(),
            on_finished,
            outcome_tx,
        ));

        Ok(SpeechTask {
            outcome: outcome_rx,
            cancel,
        })
    }
}

impl Drop for SpeechEngine {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = pending {
            if self.is_speaking() {
                cancel.notify_one();
            }
        }
    }
}

/// Poll loop of one `tell` request.
async fn poll_until_done(
    platform: Arc<dyn SpeechPlatform>,
    poll_interval: Duration,
    cancel: Arc<Notify>,
    awaiting: Arc<AtomicBool>,
    events: broadcast::Sender<SpeechEvent>,
    on_finished: Option<FinishedCallback>,
    outcome_tx: oneshot::Sender<SpeechOutcome>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the first poll happens one
    // interval after the request started.
    ticker.tick().await;

    let outcome = loop {
        tokio::select! {
            _ = cancel.notified() => {
                if let Err(e) = platform.stop() {
                    log::warn!("failed to stop speech: {e}");
                }
                break SpeechOutcome::Cancelled;
            }
            _ = ticker.tick() => match platform.status() {
                Ok(RunState::Done) => break SpeechOutcome::Finished,
                Ok(RunState::Running) => {}
                Err(e) => {
                    log::warn!("speech status query failed: {e}");
                    break SpeechOutcome::Failed(e.to_string());
                }
            },
        }
    };

    awaiting.store(false, Ordering::SeqCst);

    if outcome == SpeechOutcome::Finished {
        if let Some(callback) = on_finished {
            callback();
        }
        let _ = events.send(SpeechEvent::Finished);
    }
    let _ = outcome_tx.send(outcome);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::speech::platform::MockPlatform;

    const FAST: Duration = Duration::from_millis(5);

    fn engine(platform: &Arc<MockPlatform>) -> SpeechEngine {
        let platform: Arc<dyn SpeechPlatform> = Arc::clone(platform) as Arc<dyn SpeechPlatform>;
        SpeechEngine::new(platform, FAST).expect("engine")
    }

    // --- voice selection ---

    #[test]
    fn new_adopts_default_voice() {
        let platform = Arc::new(MockPlatform::new(0));
        let engine = engine(&platform);
        assert_eq!(engine.voice().map(|v| v.id.as_str()), Some("mock/ru"));
        assert_eq!(platform.selected().map(|v| v.id), Some("mock/ru".into()));
    }

    #[test]
    fn no_default_voice_is_init_error() {
        let platform: Arc<dyn SpeechPlatform> = Arc::new(MockPlatform::with_voices(Vec::new(), 0));
        let err = SpeechEngine::new(platform, FAST).unwrap_err();
        assert!(matches!(err, SpeechError::Init(_)));
        assert!(err.to_string().contains("no default voice"));
    }

    #[test]
    fn set_voice_by_exact_identifier() {
        let platform = Arc::new(MockPlatform::new(0));
        let mut engine = engine(&platform);

        engine.set_voice(Some("mock/en")).expect("select");
        assert_eq!(engine.voice().map(|v| v.name.as_str()), Some("David"));
        assert_eq!(platform.selected().map(|v| v.id), Some("mock/en".into()));
    }

    #[test]
    fn unknown_identifier_is_init_error_and_keeps_voice() {
        let platform = Arc::new(MockPlatform::new(0));
        let mut engine = engine(&platform);

        let err = engine.set_voice(Some("mock/EN")).unwrap_err();
        assert!(matches!(err, SpeechError::Init(_)));
        assert_eq!(engine.voice().map(|v| v.id.as_str()), Some("mock/ru"));
    }

    #[test]
    fn with_voice_selects_requested_voice() {
        let platform: Arc<dyn SpeechPlatform> = Arc::new(MockPlatform::new(0));
        let engine = SpeechEngine::with_voice(platform, "mock/en", FAST).expect("engine");
        assert_eq!(engine.voice().map(|v| v.id.as_str()), Some("mock/en"));
    }

    #[test]
    fn voices_lists_every_platform_voice() {
        let platform = Arc::new(MockPlatform::new(0));
        let engine = engine(&platform);
        assert_eq!(engine.voices().unwrap().len(), platform.voices().unwrap().len());
    }

    // --- blocking speech ---

    #[test]
    fn say_speaks_synchronously() {
        let platform = Arc::new(MockPlatform::new(0));
        let engine = engine(&platform);
        engine.say("привет").expect("say");
        assert_eq!(platform.spoken(), vec!["привет".to_string()]);
        assert!(!engine.is_speaking());
    }

    #[test]
    fn say_failure_is_logic_error() {
        let platform = Arc::new(MockPlatform::failing());
        let engine = engine(&platform);
        assert!(matches!(engine.say("x"), Err(SpeechError::Logic(_))));
    }

    // --- asynchronous speech ---

    #[tokio::test]
    async fn tell_finishes_once_and_stops_polling() {
        let platform = Arc::new(MockPlatform::new(3));
        let engine = engine(&platform);
        let mut events = engine.subscribe();

        let task = engine.tell("hello").expect("tell");
        assert!(engine.is_speaking());
        assert_eq!(task.wait().await, SpeechOutcome::Finished);
        assert!(!engine.is_speaking());

        assert_eq!(events.recv().await.unwrap(), SpeechEvent::Finished);

        let polls = platform.status_calls();
        assert_eq!(polls, 4);
        tokio::time::sleep(FAST * 6).await;
        assert_eq!(platform.status_calls(), polls);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_tell_while_waiting_is_rejected() {
        let platform = Arc::new(MockPlatform::new(1_000));
        let engine = engine(&platform);

        let first = engine.tell("one").expect("first tell");
        let err = engine.tell("two").unwrap_err();

        assert!(matches!(err, SpeechError::Logic(_)));
        assert_eq!(platform.async_requests(), 1);
        assert_eq!(platform.spoken(), vec!["one".to_string()]);

        first.cancel();
        assert_eq!(first.wait().await, SpeechOutcome::Cancelled);
    }

    #[tokio::test]
    async fn tell_again_after_completion() {
        let platform = Arc::new(MockPlatform::new(1));
        let engine = engine(&platform);

        engine.tell("one").expect("tell").wait().await;
        let second = engine.tell("two").expect("second tell");
        assert_eq!(second.wait().await, SpeechOutcome::Finished);
        assert_eq!(platform.async_requests(), 2);
    }

    #[tokio::test]
    async fn callback_runs_exactly_once() {
        let platform = Arc::new(MockPlatform::new(2));
        let engine = engine(&platform);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let task = engine
            .tell_with("hello", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .expect("tell");
        task.wait().await;

        tokio::time::sleep(FAST * 4).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_stops_platform_without_finished_event() {
        let platform = Arc::new(MockPlatform::new(1_000));
        let engine = engine(&platform);
        let mut events = engine.subscribe();

        let task = engine.tell("long text").expect("tell");
        task.cancel();
        assert_eq!(task.wait().await, SpeechOutcome::Cancelled);

        assert_eq!(platform.stop_calls(), 1);
        assert!(!engine.is_speaking());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancel_handle_cancels_pending_wait() {
        let platform = Arc::new(MockPlatform::new(1_000));
        let engine = engine(&platform);

        let task = engine.tell("long text").expect("tell");
        let handle = task.cancel_handle();
        let waiter = tokio::spawn(task.wait());
        handle.cancel();

        assert_eq!(waiter.await.unwrap(), SpeechOutcome::Cancelled);
        assert_eq!(platform.stop_calls(), 1);
    }

    #[tokio::test]
    async fn platform_rejection_leaves_engine_ready() {
        let platform = Arc::new(MockPlatform::failing());
        let engine = engine(&platform);

        assert!(matches!(engine.tell("x"), Err(SpeechError::Logic(_))));
        assert!(!engine.is_speaking());
    }

    #[tokio::test]
    async fn dropping_engine_cancels_outstanding_request() {
        let platform = Arc::new(MockPlatform::new(1_000));
        let task = {
            let engine = engine(&platform);
            engine.tell("bye").expect("tell")
        };
        assert_eq!(task.wait().await, SpeechOutcome::Cancelled);
        assert_eq!(platform.stop_calls(), 1);
    }

    #[test]
    fn tell_outside_runtime_is_logic_error() {
        let platform = Arc::new(MockPlatform::new(0));
        let engine = engine(&platform);

        assert!(matches!(engine.tell("x"), Err(SpeechError::Logic(_))));
        assert!(!engine.is_speaking());
        assert_eq!(platform.async_requests(), 0);
    }
}
