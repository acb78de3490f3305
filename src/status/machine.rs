//! Core status state machine implementation
//!
//! Handles transitions between Idle, Listening, Processing and Speaking.
//! Status can only move through the named transition operations below; each
//! one states the statuses it may start from.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::events::VoiceEvent;

/// The four possible statuses of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Nothing in flight, waiting for activation
    Idle,
    /// A recognition session is open
    Listening,
    /// A transcript is being classified or answered
    Processing,
    /// An utterance is playing
    Speaking,
}

impl Default for Status {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Idle => write!(f, "idle"),
            Status::Listening => write!(f, "listening"),
            Status::Processing => write!(f, "processing"),
            Status::Speaking => write!(f, "speaking"),
        }
    }
}

/// A transition that is not allowed from the current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("status transition {from} -> {to} is not allowed")]
pub struct TransitionError {
    pub from: Status,
    pub to: Status,
}

/// The single authoritative controller status
pub struct StatusMachine {
    /// Current status
    status: Status,
    /// Time when the current non-Idle status was entered
    entered_at: Option<Instant>,
    /// Latest status for host UI rendering
    status_tx: watch::Sender<Status>,
    /// Channel for emitting entry and exit events
    event_tx: broadcast::Sender<VoiceEvent>,
}

impl StatusMachine {
    /// Create a new status machine in Idle
    pub fn new(event_tx: broadcast::Sender<VoiceEvent>) -> Self {
        let (status_tx, _) = watch::channel(Status::Idle);
        Self {
            status: Status::Idle,
            entered_at: None,
            status_tx,
            event_tx,
        }
    }

    /// Get the current status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Observe status changes
    pub fn watch(&self) -> watch::Receiver<Status> {
        self.status_tx.subscribe()
    }

    /// Open a listening session. Barge-in from Speaking is allowed;
    /// Processing and Listening refuse.
    pub fn activate(&mut self) -> Result<(), TransitionError> {
        self.advance(&[Status::Idle, Status::Speaking], Status::Listening)
    }

    /// A transcript was produced
    pub fn capture(&mut self) -> Result<(), TransitionError> {
        self.advance(&[Status::Listening], Status::Processing)
    }

    /// The session ended with an error or without a result
    pub fn abandon(&mut self) -> Result<(), TransitionError> {
        self.advance(&[Status::Listening], Status::Idle)
    }

    /// A dispatch finished without producing speech
    pub fn resolve(&mut self) -> Result<(), TransitionError> {
        self.advance(&[Status::Processing], Status::Idle)
    }

    /// An utterance started playing. Staying in Speaking is not a transition.
    pub fn begin_speaking(&mut self) -> Result<(), TransitionError> {
        if self.status == Status::Speaking {
            return Ok(());
        }
        self.advance(&[Status::Idle, Status::Processing], Status::Speaking)
    }

    /// Speech output concluded (or was skipped). `rest` is Idle, or
    /// Processing while an AI query is still in flight.
    pub fn settle(&mut self, rest: Status) -> Result<(), TransitionError> {
        if self.status == rest {
            return Ok(());
        }
        if !matches!(rest, Status::Idle | Status::Processing) {
            return Err(TransitionError {
                from: self.status,
                to: rest,
            });
        }
        self.advance(&[Status::Processing, Status::Speaking], rest)
    }

    fn advance(&mut self, from: &[Status], to: Status) -> Result<(), TransitionError> {
        if !from.contains(&self.status) {
            debug!(from = %self.status, to = %to, "status transition refused");
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.transition_to(to);
        Ok(())
    }

    /// Perform a status transition
    fn transition_to(&mut self, new_status: Status) {
        let old_status = self.status;
        let duration_ms = self
            .entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_status,
            to = %new_status,
            duration_ms = duration_ms,
            "status transition"
        );

        self.emit_exit_event(old_status, duration_ms);

        self.status = new_status;
        self.entered_at = if new_status != Status::Idle {
            Some(Instant::now())
        } else {
            None
        };
        self.status_tx.send_replace(new_status);

        self.emit_entry_event(new_status);
    }

    /// Emit an exit event for the given status
    fn emit_exit_event(&self, status: Status, duration_ms: u64) {
        let event = match status {
            Status::Idle => return,
            Status::Listening => VoiceEvent::ListeningEnded { duration_ms },
            Status::Processing => VoiceEvent::ProcessingComplete { duration_ms },
            Status::Speaking => VoiceEvent::SpeakingComplete { duration_ms },
        };

        debug!(%event, "emitting exit event");
        let _ = self.event_tx.send(event);
    }

    /// Emit an entry event for the given status
    fn emit_entry_event(&self, status: Status) {
        let event = match status {
            Status::Idle => return,
            Status::Listening => VoiceEvent::ListeningStarted,
            Status::Processing => VoiceEvent::ProcessingStarted,
            Status::Speaking => VoiceEvent::SpeakingStarted,
        };

        debug!(%event, "emitting entry event");
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_status_machine() -> (StatusMachine, broadcast::Receiver<VoiceEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (StatusMachine::new(tx), rx)
    }

    #[test]
    fn test_initial_status() {
        let (sm, _) = create_status_machine();
        assert_eq!(sm.status(), Status::Idle);
    }

    #[test]
    fn test_full_interaction_cycle() {
        let (mut sm, _) = create_status_machine();

        sm.activate().unwrap();
        assert_eq!(sm.status(), Status::Listening);
        sm.capture().unwrap();
        assert_eq!(sm.status(), Status::Processing);
        sm.begin_speaking().unwrap();
        assert_eq!(sm.status(), Status::Speaking);
        sm.settle(Status::Idle).unwrap();
        assert_eq!(sm.status(), Status::Idle);
    }

    #[test]
    fn test_activate_refused_while_processing() {
        let (mut sm, _) = create_status_machine();
        sm.activate().unwrap();
        sm.capture().unwrap();

        let err = sm.activate().unwrap_err();
        assert_eq!(
            err,
            TransitionError {
                from: Status::Processing,
                to: Status::Listening
            }
        );
        assert_eq!(sm.status(), Status::Processing);
    }

    #[test]
    fn test_activate_refused_while_listening() {
        let (mut sm, _) = create_status_machine();
        sm.activate().unwrap();
        assert!(sm.activate().is_err());
        assert_eq!(sm.status(), Status::Listening);
    }

    #[test]
    fn test_barge_in_from_speaking() {
        let (mut sm, _) = create_status_machine();
        sm.begin_speaking().unwrap();
        sm.activate().unwrap();
        assert_eq!(sm.status(), Status::Listening);
    }

    #[test]
    fn test_capture_requires_listening() {
        let (mut sm, _) = create_status_machine();
        assert!(sm.capture().is_err());
        sm.begin_speaking().unwrap();
        assert!(sm.capture().is_err());
        assert_eq!(sm.status(), Status::Speaking);
    }

    #[test]
    fn test_settle_back_to_processing_while_query_pending() {
        let (mut sm, _) = create_status_machine();
        sm.activate().unwrap();
        sm.capture().unwrap();
        sm.begin_speaking().unwrap();

        sm.settle(Status::Processing).unwrap();
        assert_eq!(sm.status(), Status::Processing);
        sm.resolve().unwrap();
        assert_eq!(sm.status(), Status::Idle);
    }

    #[test]
    fn test_settle_rejects_listening_as_rest() {
        let (mut sm, _) = create_status_machine();
        sm.begin_speaking().unwrap();
        assert!(sm.settle(Status::Listening).is_err());
        assert_eq!(sm.status(), Status::Speaking);
    }

    #[test]
    fn test_events_and_watch_follow_transitions() {
        let (mut sm, mut rx) = create_status_machine();
        let watch = sm.watch();

        sm.activate().unwrap();
        sm.abandon().unwrap();

        assert_eq!(rx.try_recv().unwrap(), VoiceEvent::ListeningStarted);
        assert!(matches!(
            rx.try_recv().unwrap(),
            VoiceEvent::ListeningEnded { .. }
        ));
        assert!(rx.try_recv().is_err());
        assert_eq!(*watch.borrow(), Status::Idle);
    }

    #[test]
    fn test_refused_transition_emits_nothing() {
        let (mut sm, mut rx) = create_status_machine();
        assert!(sm.resolve().is_err());
        assert!(rx.try_recv().is_err());
    }
}
