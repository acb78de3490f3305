//! Speech engine seams
//!
//! Speech-to-text and text-to-speech engines are callback driven. The
//! controller hands each session or utterance a sink tagged with its token;
//! engines report progress through the sink and the controller drops
//! anything carrying a stale token.

mod console;
mod recognizer;
mod synthesizer;

pub use console::{ConsoleMicrophone, ConsoleRecognizer, ConsoleSynthesizer};
pub use recognizer::{
    RecognitionErrorKind, RecognitionOptions, RecognizerEvent, RecognizerSignal, RecognizerSink,
    SessionId, SpeechRecognizer,
};
pub use synthesizer::{
    SpeechSynthesizer, SynthesisErrorKind, SynthesisEvent, SynthesisSignal, SynthesisSink,
    UtteranceId,
};

/// Errors an engine can report when asked to start work
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine already has an active session")]
    AlreadyActive,

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine failed: {0}")]
    Failed(String),
}
