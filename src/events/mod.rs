//! Events module for controller observers
//!
//! Provides structured event types for status entry and exit, captured
//! transcripts, navigation and surfaced notifications. Events are
//! broadcast; the IPC server forwards them to subscribed clients.

use serde::{Deserialize, Serialize};

use crate::collab::{Notification, Screen};

/// Events emitted by the controller while it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// A recognition session was opened
    ListeningStarted,

    /// The listening state was left
    ListeningEnded {
        /// Duration in milliseconds that the session was listening
        duration_ms: u64,
    },

    /// A transcript was captured and handed to the interpreter
    TranscriptCaptured { text: String },

    /// Entered processing (classification or AI query in flight)
    ProcessingStarted,

    /// Left processing
    ProcessingComplete {
        /// Duration in milliseconds spent processing
        duration_ms: u64,
    },

    /// An utterance started playing
    SpeakingStarted,

    /// Speech output stopped and status moved on
    SpeakingComplete {
        /// Duration in milliseconds spent speaking
        duration_ms: u64,
    },

    /// The navigation callback was invoked
    Navigated { screen: Screen },

    /// A notification was raised for the user
    Notified { notification: Notification },
}

impl std::fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceEvent::ListeningStarted => write!(f, "LISTENING_STARTED"),
            VoiceEvent::ListeningEnded { duration_ms } => {
                write!(f, "LISTENING_ENDED ({}ms)", duration_ms)
            }
            VoiceEvent::TranscriptCaptured { text } => {
                write!(f, "TRANSCRIPT_CAPTURED ({:?})", text)
            }
            VoiceEvent::ProcessingStarted => write!(f, "PROCESSING_STARTED"),
            VoiceEvent::ProcessingComplete { duration_ms } => {
                write!(f, "PROCESSING_COMPLETE ({}ms)", duration_ms)
            }
            VoiceEvent::SpeakingStarted => write!(f, "SPEAKING_STARTED"),
            VoiceEvent::SpeakingComplete { duration_ms } => {
                write!(f, "SPEAKING_COMPLETE ({}ms)", duration_ms)
            }
            VoiceEvent::Navigated { screen } => write!(f, "NAVIGATED ({})", screen.id()),
            VoiceEvent::Notified { notification } => {
                write!(f, "NOTIFIED ({})", notification.title)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::Severity;

    #[test]
    fn test_event_serialization() {
        let event = VoiceEvent::SpeakingComplete { duration_ms: 1500 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("speaking_complete"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"navigated","screen":"object-detection"}"#;
        let event: VoiceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            VoiceEvent::Navigated {
                screen: Screen::ObjectDetection
            }
        );
    }

    #[test]
    fn test_notification_event_carries_payload() {
        let event = VoiceEvent::Notified {
            notification: Notification::new("Unknown Command", "You said: \"hm\"", Severity::Info),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"notified\""));
        assert!(json.contains("Unknown Command"));
        assert_eq!(event.to_string(), "NOTIFIED (Unknown Command)");
    }
}
