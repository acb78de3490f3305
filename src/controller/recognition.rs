//! Recognition session manager
//!
//! Wraps the recognizer and keeps at most one session open. The manager
//! owns the transcript: it is cleared whenever a session opens and set when
//! that session produces its one result.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::outbox::Outbox;
use super::player::UtterancePlayer;
use super::ControllerEvent;
use crate::collab::{Notification, Severity};
use crate::engine::{
    EngineError, RecognitionErrorKind, RecognitionOptions, RecognizerEvent, RecognizerSignal,
    RecognizerSink, SessionId, SpeechRecognizer,
};
use crate::events::VoiceEvent;
use crate::status::{Status, StatusMachine};

struct Session {
    id: SessionId,
    /// A transcript was already forwarded
    delivered: bool,
    /// An error already closed the session
    failed: bool,
    /// We asked the engine to stop
    stop_requested: bool,
}

pub(crate) struct RecognitionManager {
    engine: Box<dyn SpeechRecognizer>,
    supported: bool,
    options: RecognitionOptions,
    session: Option<Session>,
    next_id: u64,
    transcript_tx: watch::Sender<String>,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl RecognitionManager {
    pub(crate) fn new(
        engine: Box<dyn SpeechRecognizer>,
        options: RecognitionOptions,
        tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        let supported = engine.is_supported();
        let (transcript_tx, _) = watch::channel(String::new());
        Self {
            engine,
            supported,
            options,
            session: None,
            next_id: 0,
            transcript_tx,
            tx,
        }
    }

    pub(crate) fn is_supported(&self) -> bool {
        self.supported
    }

    pub(crate) fn watch_transcript(&self) -> watch::Receiver<String> {
        self.transcript_tx.subscribe()
    }

    /// Open a session if status allows it, cancelling speech first.
    /// Returns whether a session was opened.
    pub(crate) fn start(
        &mut self,
        status: &mut StatusMachine,
        player: &mut UtterancePlayer,
        outbox: &Outbox,
    ) -> bool {
        if !self.supported {
            debug!("speech recognition unsupported, start ignored");
            return false;
        }
        if !matches!(status.status(), Status::Idle | Status::Speaking) {
            debug!(status = %status.status(), "start ignored");
            return false;
        }

        if player.cancel() {
            debug!("barge-in, speech cancelled");
        }
        if let Err(err) = status.activate() {
            warn!(%err, "could not enter listening");
            return false;
        }

        self.next_id += 1;
        let id = SessionId(self.next_id);
        if let Some(previous) = self.session.replace(Session {
            id,
            delivered: false,
            failed: false,
            stop_requested: false,
        }) {
            debug!(session = %previous.id, "previous session record dropped");
        }
        self.transcript_tx.send_replace(String::new());

        match self
            .engine
            .start(&self.options, RecognizerSink::new(id, self.tx.clone()))
        {
            Ok(()) => {
                info!(
                    session = %id,
                    language = %self.options.language,
                    "recognition session opened"
                );
                true
            }
            Err(err) => {
                self.session = None;
                let _ = status.abandon();
                match err {
                    EngineError::AlreadyActive => {
                        warn!(session = %id, "recognizer reports a session already running");
                    }
                    err => {
                        warn!(session = %id, %err, "recognizer failed to start");
                        outbox.notify(Notification::new(
                            "Voice Error",
                            format!("Could not start listening. Error: {}", err),
                            Severity::Destructive,
                        ));
                    }
                }
                false
            }
        }
    }

    /// Ask the engine to stop. Status moves when the engine answers.
    pub(crate) fn stop(&mut self, status: &StatusMachine) {
        if status.status() != Status::Listening {
            debug!(status = %status.status(), "stop ignored");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.stop_requested {
            return;
        }
        session.stop_requested = true;
        debug!(session = %session.id, "stop requested");
        self.engine.stop();
    }

    /// Handle one recognizer callback. Returns the transcript to dispatch,
    /// at most once per session.
    pub(crate) fn on_event(
        &mut self,
        event: RecognizerEvent,
        status: &mut StatusMachine,
        outbox: &Outbox,
    ) -> Option<String> {
        let Some(session) = self.session.as_mut().filter(|s| s.id == event.session) else {
            debug!(
                session = %event.session,
                signal = ?event.signal,
                "stale recognizer event dropped"
            );
            return None;
        };

        match event.signal {
            RecognizerSignal::Started => {
                debug!(session = %session.id, "recognizer started");
                None
            }
            RecognizerSignal::Result(text) => {
                if session.delivered || session.failed {
                    debug!(session = %session.id, "extra result ignored");
                    return None;
                }
                session.delivered = true;
                let session_id = session.id;

                if let Err(err) = status.capture() {
                    warn!(session = %session_id, %err, "result arrived outside listening");
                    return None;
                }

                let transcript = text.trim().to_string();
                info!(session = %session_id, %transcript, "transcript captured");
                self.transcript_tx.send_replace(transcript.clone());
                outbox.emit(VoiceEvent::TranscriptCaptured {
                    text: transcript.clone(),
                });
                Some(transcript)
            }
            RecognizerSignal::Error(kind) => {
                if session.delivered || session.failed {
                    debug!(session = %session.id, %kind, "error after session concluded");
                    return None;
                }
                session.failed = true;

                let self_aborted = kind == RecognitionErrorKind::Aborted && session.stop_requested;
                if kind.is_transient() || self_aborted {
                    debug!(session = %session.id, %kind, "recognition ended quietly");
                } else {
                    warn!(session = %session.id, %kind, "recognition failed");
                    outbox.notify(Notification::new(
                        "Voice Error",
                        format!("Could not understand. Error: {}", kind),
                        Severity::Destructive,
                    ));
                }

                if status.status() == Status::Listening {
                    let _ = status.abandon();
                }
                None
            }
            RecognizerSignal::Ended => {
                let delivered = session.delivered;
                let id = session.id;
                self.session = None;

                if !delivered && status.status() == Status::Listening {
                    debug!(session = %id, "session ended without result or error");
                    let _ = status.abandon();
                }
                None
            }
        }
    }
}
