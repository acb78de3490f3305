//! Voice interaction controller
//!
//! One event loop owns the status machine, the recognition session manager,
//! the utterance player and the command dispatcher. Recognizer and
//! synthesizer callbacks, scheduling timers, AI-query completions and host
//! commands all arrive as [`ControllerEvent`]s on a single channel, so only
//! one of them is ever being handled at a time.

mod dispatcher;
mod event_loop;
mod handle;
mod outbox;
mod player;
mod recognition;

use tokio::sync::oneshot;

use crate::collab::{AnswerError, Navigator};
use crate::engine::{RecognizerEvent, SynthesisEvent, UtteranceId};

pub use dispatcher::QueryId;
pub use event_loop::{ControllerParts, ControllerSettings, VoiceController};
pub use handle::{Completion, VoiceHandle};

/// How an utterance request concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtteranceOutcome {
    /// Played to the end
    Completed,
    /// Nothing to play: empty text, no synthesizer, or the microphone was open
    Skipped,
    /// A newer utterance replaced it
    Superseded,
    /// Cancelled by barge-in
    Interrupted,
    /// The synthesizer kept failing
    Failed,
}

/// Errors returned to the host through a [`VoiceHandle`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("voice controller is not running")]
    Stopped,
}

/// Requests from the host UI
pub enum Command {
    StartListening,
    StopListening,
    Speak {
        text: String,
        done: Option<oneshot::Sender<UtteranceOutcome>>,
    },
    RegisterNavigator(Box<dyn Navigator>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::StartListening => write!(f, "StartListening"),
            Command::StopListening => write!(f, "StopListening"),
            Command::Speak { text, done } => f
                .debug_struct("Speak")
                .field("text", text)
                .field("awaited", &done.is_some())
                .finish(),
            Command::RegisterNavigator(_) => write!(f, "RegisterNavigator"),
        }
    }
}

/// Everything the controller loop reacts to
#[derive(Debug)]
pub enum ControllerEvent {
    Command(Command),
    Recognizer(RecognizerEvent),
    Synthesizer(SynthesisEvent),
    /// Scheduling delay (or retry backoff) for an utterance elapsed
    UtteranceDue(UtteranceId),
    QueryResolved {
        query: QueryId,
        outcome: Result<String, AnswerError>,
    },
}
