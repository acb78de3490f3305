//! Text-to-speech engine interface

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::controller::ControllerEvent;

/// Token identifying one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub(crate) u64);

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "utterance#{}", self.0)
    }
}

/// Error kinds reported by a synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesisErrorKind {
    Interrupted,
    Canceled,
    AudioBusy,
    Synthesis,
    Other(String),
}

impl std::fmt::Display for SynthesisErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::Canceled => write!(f, "canceled"),
            Self::AudioBusy => write!(f, "audio-busy"),
            Self::Synthesis => write!(f, "synthesis-failed"),
            Self::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Callback kinds a synthesizer reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisSignal {
    Started,
    Ended,
    Error(SynthesisErrorKind),
}

/// A synthesizer callback tagged with its utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisEvent {
    pub utterance: UtteranceId,
    pub signal: SynthesisSignal,
}

/// Reporting handle given to a synthesizer for one utterance
#[derive(Debug, Clone)]
pub struct SynthesisSink {
    utterance: UtteranceId,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl SynthesisSink {
    pub(crate) fn new(utterance: UtteranceId, tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { utterance, tx }
    }

    pub fn utterance(&self) -> UtteranceId {
        self.utterance
    }

    pub fn started(&self) {
        self.send(SynthesisSignal::Started);
    }

    pub fn ended(&self) {
        self.send(SynthesisSignal::Ended);
    }

    pub fn error(&self, kind: SynthesisErrorKind) {
        self.send(SynthesisSignal::Error(kind));
    }

    fn send(&self, signal: SynthesisSignal) {
        let _ = self.tx.send(ControllerEvent::Synthesizer(SynthesisEvent {
            utterance: self.utterance,
            signal,
        }));
    }
}

/// A text-to-speech engine
pub trait SpeechSynthesizer: Send {
    /// Whether the engine can run at all on this host
    fn is_supported(&self) -> bool;

    /// Start speaking `text`. Progress is reported through `sink`.
    fn speak(&mut self, text: &str, sink: SynthesisSink);

    /// Drop everything playing or queued
    fn cancel_all(&mut self);
}
