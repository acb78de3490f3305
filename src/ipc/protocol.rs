//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::VoiceEvent;
use crate::status::Status;

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from the host UI to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current controller status
    GetStatus,

    /// Tap-to-speak
    StartListening,

    /// Stop the open recognition session
    StopListening,

    /// Speak text, replacing anything playing
    Speak { text: String },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to controller events
    Subscribe,
}

/// Responses from the controller to the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current controller status
    Status(ControllerStatus),

    /// Command handed to the controller
    Accepted,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Pushed to subscribed clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Push {
    /// Controller event occurred
    Event { event: VoiceEvent },
}

/// Full controller status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    /// Daemon version
    pub version: String,

    /// Current status
    pub status: Status,

    /// Last heard text
    pub transcript: String,

    /// Whether speech recognition is available
    pub supported: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::Speak {
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"speak\""));
        assert!(json.contains("hello"));

        let parsed: Request = serde_json::from_str(r#"{"type":"start_listening"}"#).unwrap();
        assert_eq!(parsed, Request::StartListening);
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(ControllerStatus {
            version: "0.1.0".to_string(),
            status: Status::Idle,
            transcript: String::new(),
            supported: true,
            uptime_secs: 3,
        });
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"status\""));
        assert!(json.contains("\"status\":\"idle\""));
    }

    #[test]
    fn test_push_wraps_event() {
        let note = Push::Event {
            event: VoiceEvent::SpeakingStarted,
        };
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, r#"{"type":"event","event":{"type":"speaking_started"}}"#);
    }
}
