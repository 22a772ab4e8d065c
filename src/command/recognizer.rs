//! Speech recognizer seam and the single-shot command center
//!
//! Idle -> Listening on activation, back to Idle on a transcript or an
//! error. Only one listen runs at a time, and a listen holds the audio input
//! lease so it can never overlap a capture session.

use super::{CommandTable, Navigator, Target, IDLE_HINT, NOT_RECOGNIZED};
use crate::audio::DeviceArbiter;
use crate::error::{friendly_error, Error, Result};
use crate::session::SessionStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Device arbiter label for command listening
pub const OWNER: &str = "voice-command";

/// Converts one utterance from the audio input into text
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// False when no recognition backend is available on this device
    fn is_supported(&self) -> bool;

    async fn recognize(&self) -> Result<String>;
}

/// Recognizer for builds or configurations without speech-to-text
pub struct NoRecognizer;

#[async_trait]
impl SpeechRecognizer for NoRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    async fn recognize(&self) -> Result<String> {
        Err(Error::RecognitionUnsupported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Navigated {
        transcript: String,
        target: Target,
        message: String,
    },
    NotRecognized {
        transcript: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandStatus {
    pub supported: bool,
    pub listening: bool,
    pub last_transcript: Option<String>,
    pub message: String,
    pub greeting: String,
}

struct CenterState {
    last_transcript: Option<String>,
    message: String,
}

pub struct CommandCenter {
    recognizer: Arc<dyn SpeechRecognizer>,
    table: CommandTable,
    navigator: Arc<dyn Navigator>,
    session: SessionStore,
    arbiter: DeviceArbiter,
    listening: AtomicBool,
    state: Mutex<CenterState>,
}

/// Resets the listening flag however the listen ends (including cancellation)
struct ListeningGuard<'a>(&'a AtomicBool);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CommandCenter {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        table: CommandTable,
        navigator: Arc<dyn Navigator>,
        session: SessionStore,
        arbiter: DeviceArbiter,
    ) -> Self {
        Self {
            recognizer,
            table,
            navigator,
            session,
            arbiter,
            listening: AtomicBool::new(false),
            state: Mutex::new(CenterState {
                last_transcript: None,
                message: IDLE_HINT.to_string(),
            }),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_supported()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Listen once and dispatch the transcript
    pub async fn listen(&self) -> Result<CommandOutcome> {
        let transcript = self.transcribe(OWNER).await?;
        Ok(self.dispatch(&transcript))
    }

    /// Listen once on behalf of `owner` and return the raw transcript
    ///
    /// Fails with `RecognitionUnsupported`, `AlreadyListening` or
    /// `DeviceBusy` before touching the recognizer.
    pub async fn transcribe(&self, owner: &str) -> Result<String> {
        if !self.recognizer.is_supported() {
            self.set_message(friendly_error(&Error::RecognitionUnsupported).message);
            return Err(Error::RecognitionUnsupported);
        }

        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Listen requested by '{}' while already listening", owner);
            return Err(Error::AlreadyListening);
        }
        let _guard = ListeningGuard(&self.listening);

        let _lease = self.arbiter.try_acquire(owner)?;
        self.set_message("Listening...".to_string());
        log::info!("Listening for speech ({})", owner);

        match self.recognizer.recognize().await {
            Ok(transcript) => {
                log::info!("Heard: \"{}\"", transcript);
                Ok(transcript)
            }
            Err(e) => {
                log::warn!("Recognition failed: {}", e);
                self.set_message(friendly_error(&e).message);
                Err(e)
            }
        }
    }

    /// Route a transcript; navigates at most once
    pub fn dispatch(&self, transcript: &str) -> CommandOutcome {
        let command = transcript.trim().to_lowercase();

        let Some(route) = self.table.resolve(&command) else {
            log::info!("No route for \"{}\"", command);
            self.update(command.clone(), NOT_RECOGNIZED);
            return CommandOutcome::NotRecognized {
                transcript: command,
            };
        };

        let action = route.action;
        let target = action.target();
        let message = action.status_message();
        self.update(command.clone(), message);

        if action == super::Action::Logout {
            self.session.clear();
        }
        log::info!("Command \"{}\" -> {}", command, target);
        self.navigator.navigate(target);

        CommandOutcome::Navigated {
            transcript: command,
            target,
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> CommandStatus {
        let state = self.state.lock();
        CommandStatus {
            supported: self.recognizer.is_supported(),
            listening: self.is_listening(),
            last_transcript: state.last_transcript.clone(),
            message: state.message.clone(),
            greeting: self.session.greeting(),
        }
    }

    fn set_message(&self, message: String) {
        self.state.lock().message = message;
    }

    fn update(&self, transcript: String, message: &str) {
        let mut state = self.state.lock();
        state.last_transcript = Some(transcript);
        state.message = message.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Action, CommandRoute};
    use crate::testing::{RecordingNavigator, ScriptedRecognizer};
    use tokio::sync::Notify;

    fn center(
        recognizer: ScriptedRecognizer,
        session: SessionStore,
    ) -> (Arc<CommandCenter>, Arc<RecordingNavigator>, DeviceArbiter) {
        let navigator = Arc::new(RecordingNavigator::observing(session.clone()));
        let arbiter = DeviceArbiter::new();
        let center = Arc::new(CommandCenter::new(
            Arc::new(recognizer),
            CommandTable::default(),
            navigator.clone(),
            session,
            arbiter.clone(),
        ));
        (center, navigator, arbiter)
    }

    #[tokio::test]
    async fn test_listen_navigates_once() {
        let (center, navigator, arbiter) = center(
            ScriptedRecognizer::with_transcripts(vec!["Open my Profile"]),
            SessionStore::in_memory(),
        );
        assert_eq!(center.status().message, IDLE_HINT);

        let outcome = center.listen().await.unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Navigated {
                transcript: "open my profile".to_string(),
                target: Target::Profile,
                message: "Opening Profile...".to_string(),
            }
        );
        assert_eq!(navigator.targets(), vec![Target::Profile]);
        assert!(!center.is_listening());
        assert!(!arbiter.is_held());

        let status = center.status();
        assert_eq!(status.last_transcript.as_deref(), Some("open my profile"));
        assert_eq!(status.message, "Opening Profile...");
    }

    #[tokio::test]
    async fn test_order_sensitive_routing() {
        let recognizer = ScriptedRecognizer::with_transcripts(vec!["show products for profile"]);
        let navigator = Arc::new(RecordingNavigator::new());
        let table = CommandTable::new(vec![
            CommandRoute::new("profile", Action::OpenProfile),
            CommandRoute::new("product", Action::OpenProducts),
        ])
        .unwrap();
        let center = CommandCenter::new(
            Arc::new(recognizer),
            table,
            navigator.clone(),
            SessionStore::in_memory(),
            DeviceArbiter::new(),
        );

        center.listen().await.unwrap();
        assert_eq!(navigator.targets(), vec![Target::Profile]);
    }

    #[tokio::test]
    async fn test_not_recognized_has_no_effect() {
        let session = SessionStore::in_memory();
        session.set("jane@x.io");
        let (center, navigator, _) = center(
            ScriptedRecognizer::with_transcripts(vec!["what's the weather"]),
            session.clone(),
        );

        let outcome = center.listen().await.unwrap();
        assert!(matches!(outcome, CommandOutcome::NotRecognized { .. }));
        assert!(navigator.targets().is_empty());
        assert_eq!(center.status().message, NOT_RECOGNIZED);
        assert_eq!(session.identifier().as_deref(), Some("jane@x.io"));
    }

    #[tokio::test]
    async fn test_logout_clears_before_navigating() {
        let session = SessionStore::in_memory();
        session.set("jane@x.io");
        let (center, navigator, _) = center(
            ScriptedRecognizer::with_transcripts(vec!["Logout"]),
            session.clone(),
        );
        assert_eq!(center.status().greeting, "Welcome, jane@x.io!");

        center.listen().await.unwrap();
        assert_eq!(navigator.visits(), vec![(Target::Login, None)]);
        assert_eq!(session.identifier(), None);
        assert_eq!(center.status().greeting, "Welcome, User!");
        assert_eq!(center.status().message, "Logging out...");
    }

    #[tokio::test]
    async fn test_unsupported_does_nothing() {
        let session = SessionStore::in_memory();
        session.set("jane@x.io");
        let (center, navigator, arbiter) = center(ScriptedRecognizer::unsupported(), session.clone());

        assert_eq!(center.listen().await.unwrap_err(), Error::RecognitionUnsupported);
        assert!(navigator.targets().is_empty());
        assert!(!arbiter.is_held());
        assert!(!center.status().supported);
        assert_eq!(session.identifier().as_deref(), Some("jane@x.io"));
    }

    #[tokio::test]
    async fn test_recognition_error_returns_to_idle() {
        let (center, navigator, arbiter) = center(
            ScriptedRecognizer::failing(Error::TransportError("no speech".to_string())),
            SessionStore::in_memory(),
        );
        assert!(matches!(
            center.listen().await,
            Err(Error::TransportError(_))
        ));
        assert!(!center.is_listening());
        assert!(!arbiter.is_held());
        assert!(navigator.targets().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_listen_rejected() {
        let gate = Arc::new(Notify::new());
        let (center, navigator, arbiter) = center(
            ScriptedRecognizer::with_transcripts(vec!["show products"]).gated(gate.clone()),
            SessionStore::in_memory(),
        );

        let first = {
            let center = center.clone();
            tokio::spawn(async move { center.listen().await })
        };
        while !center.is_listening() {
            tokio::task::yield_now().await;
        }

        assert_eq!(center.listen().await.unwrap_err(), Error::AlreadyListening);
        assert!(center.status().listening);
        assert_eq!(arbiter.holder().as_deref(), Some(OWNER));

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(
            outcome,
            CommandOutcome::Navigated {
                target: Target::Products,
                ..
            }
        ));
        assert_eq!(navigator.targets(), vec![Target::Products]);
        assert!(!center.is_listening());
    }

    #[tokio::test]
    async fn test_busy_device_blocks_listen() {
        let (center, navigator, arbiter) = center(
            ScriptedRecognizer::with_transcripts(vec!["logout"]),
            SessionStore::in_memory(),
        );
        let lease = arbiter.try_acquire("enrollment").unwrap();

        assert_eq!(
            center.listen().await.unwrap_err(),
            Error::DeviceBusy {
                holder: "enrollment".to_string()
            }
        );
        assert!(!center.is_listening());
        assert!(navigator.targets().is_empty());

        drop(lease);
        center.listen().await.unwrap();
        assert_eq!(navigator.targets(), vec![Target::Login]);
    }
}
