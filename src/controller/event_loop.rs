//! The controller event loop

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::dispatcher::Dispatcher;
use super::handle::VoiceHandle;
use super::outbox::Outbox;
use super::player::UtterancePlayer;
use super::recognition::RecognitionManager;
use super::{Command, ControllerEvent};
use crate::collab::{Notification, Notifier, QuestionAnswerer, Severity};
use crate::command::interpret;
use crate::config::Config;
use crate::engine::{RecognitionOptions, SpeechRecognizer, SpeechSynthesizer};
use crate::events::VoiceEvent;
use crate::status::{Status, StatusMachine};

/// Engines and collaborators the controller is built from
pub struct ControllerParts {
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    pub answerer: Arc<dyn QuestionAnswerer>,
    pub notifier: Arc<dyn Notifier>,
}

/// Tunables for the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Recognizer language tag
    pub language: String,
    /// Delay between cancelling speech and starting the next utterance
    pub speak_delay: Duration,
    /// Wait before retrying an utterance the engine failed
    pub retry_backoff: Duration,
    /// Automatic retries per utterance
    pub max_speech_retries: u8,
    /// Upper bound on an AI query; `None` waits forever
    pub query_timeout: Option<Duration>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            speak_delay: Duration::from_millis(50),
            retry_backoff: Duration::from_millis(100),
            max_speech_retries: 1,
            query_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            language: config.language.clone(),
            speak_delay: config.speak_delay,
            retry_backoff: config.retry_backoff,
            max_speech_retries: config.max_speech_retries,
            query_timeout: config.query_timeout,
        }
    }
}

/// Owns the status machine and the four components that advance it
pub struct VoiceController {
    status: StatusMachine,
    recognition: RecognitionManager,
    player: UtterancePlayer,
    dispatcher: Dispatcher,
    outbox: Outbox,
    event_tx: broadcast::Sender<VoiceEvent>,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl VoiceController {
    /// Create a controller and the receiver its loop consumes
    pub fn new(
        parts: ControllerParts,
        settings: ControllerSettings,
        event_tx: broadcast::Sender<VoiceEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbox = Outbox::new(parts.notifier, event_tx.clone());

        let recognition = RecognitionManager::new(
            parts.recognizer,
            RecognitionOptions::single_shot(settings.language),
            tx.clone(),
        );
        if !recognition.is_supported() {
            warn!("speech recognition not supported on this host");
            outbox.notify(Notification::new(
                "Voice not supported",
                "Speech recognition is not available on this device.",
                Severity::Destructive,
            ));
        }

        let player = UtterancePlayer::new(
            parts.synthesizer,
            settings.speak_delay,
            settings.retry_backoff,
            settings.max_speech_retries.min(1),
            tx.clone(),
        );
        let dispatcher = Dispatcher::new(parts.answerer, settings.query_timeout, tx.clone());

        let controller = Self {
            status: StatusMachine::new(event_tx.clone()),
            recognition,
            player,
            dispatcher,
            outbox,
            event_tx,
            tx,
        };
        (controller, rx)
    }

    /// Handle for the host UI
    pub fn handle(&self) -> VoiceHandle {
        VoiceHandle::new(
            self.tx.clone(),
            self.status.watch(),
            self.recognition.watch_transcript(),
            self.event_tx.clone(),
            self.recognition.is_supported(),
        )
    }

    /// Get the current status
    pub fn status(&self) -> Status {
        self.status.status()
    }

    /// Run the controller, processing events until every sender is gone
    pub async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<ControllerEvent>) {
        info!("voice controller started in Idle");

        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }

        info!("voice controller stopped");
    }

    /// Process one event
    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Command(command) => self.handle_command(command),
            ControllerEvent::Recognizer(event) => {
                if let Some(transcript) =
                    self.recognition.on_event(event, &mut self.status, &self.outbox)
                {
                    let action = interpret(&transcript);
                    self.dispatcher
                        .dispatch(action, &mut self.status, &mut self.player, &self.outbox);
                }
            }
            ControllerEvent::Synthesizer(event) => {
                let rest = self.dispatcher.resting_status();
                self.player.on_event(event, &mut self.status, rest);
            }
            ControllerEvent::UtteranceDue(id) => self.player.on_due(id),
            ControllerEvent::QueryResolved { query, outcome } => {
                self.dispatcher.on_query_resolved(
                    query,
                    outcome,
                    &mut self.status,
                    &mut self.player,
                    &self.outbox,
                );
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, status = %self.status.status(), "command received");
        match command {
            Command::StartListening => {
                if self.dispatcher.query_in_flight() {
                    debug!("start ignored while a query is in flight");
                    return;
                }
                self.recognition
                    .start(&mut self.status, &mut self.player, &self.outbox);
            }
            Command::StopListening => self.recognition.stop(&self.status),
            Command::Speak { text, done } => {
                let rest = self.dispatcher.resting_status();
                self.player.speak(text, done, &mut self.status, rest);
            }
            Command::RegisterNavigator(navigator) => self.dispatcher.register_navigator(navigator),
        }
    }
}
