//! Speech-to-text engine interface

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::EngineError;
use crate::controller::ControllerEvent;

/// Token identifying one recognition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub(crate) u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// How a recognition session is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// BCP 47 language tag
    pub language: String,
    /// Keep listening after the first result
    pub continuous: bool,
    /// Deliver partial transcripts
    pub interim_results: bool,
    /// Number of alternatives per result
    pub max_alternatives: u8,
}

impl RecognitionOptions {
    /// One final result per session, single alternative
    pub fn single_shot(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            continuous: false,
            interim_results: false,
            max_alternatives: 1,
        }
    }
}

/// Error kinds reported by a recognizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionErrorKind {
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    LanguageNotSupported,
    Other(String),
}

impl RecognitionErrorKind {
    /// Parse an engine error code such as `no-speech`
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "language-not-supported" => Self::LanguageNotSupported,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::LanguageNotSupported => "language-not-supported",
            Self::Other(code) => code,
        }
    }

    /// Silence on the line. Expected and never shown to the user.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NoSpeech)
    }
}

impl std::fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Callback kinds a recognizer reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerSignal {
    Started,
    Result(String),
    Error(RecognitionErrorKind),
    Ended,
}

/// A recognizer callback tagged with its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerEvent {
    pub session: SessionId,
    pub signal: RecognizerSignal,
}

/// Reporting handle given to a recognizer for one session
#[derive(Debug, Clone)]
pub struct RecognizerSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl RecognizerSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn started(&self) {
        self.send(RecognizerSignal::Started);
    }

    pub fn result(&self, transcript: impl Into<String>) {
        self.send(RecognizerSignal::Result(transcript.into()));
    }

    pub fn error(&self, kind: RecognitionErrorKind) {
        self.send(RecognizerSignal::Error(kind));
    }

    pub fn ended(&self) {
        self.send(RecognizerSignal::Ended);
    }

    fn send(&self, signal: RecognizerSignal) {
        // Controller gone means the app is shutting down
        let _ = self.tx.send(ControllerEvent::Recognizer(RecognizerEvent {
            session: self.session,
            signal,
        }));
    }
}

/// A speech-to-text engine
pub trait SpeechRecognizer: Send {
    /// Whether the engine can run at all on this host
    fn is_supported(&self) -> bool;

    /// Open a session. Progress is reported through `sink`.
    fn start(&mut self, options: &RecognitionOptions, sink: RecognizerSink)
        -> Result<(), EngineError>;

    /// Ask the open session to stop. The engine answers through the sink.
    fn stop(&mut self);
}
