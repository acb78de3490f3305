//! Host-facing handle to a running controller

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::{Command, ControllerError, ControllerEvent, UtteranceOutcome};
use crate::collab::Navigator;
use crate::events::VoiceEvent;
use crate::status::Status;

/// Cloneable handle the host UI uses to read and drive the controller
#[derive(Clone)]
pub struct VoiceHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
    status_rx: watch::Receiver<Status>,
    transcript_rx: watch::Receiver<String>,
    event_tx: broadcast::Sender<VoiceEvent>,
    supported: bool,
}

impl VoiceHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<ControllerEvent>,
        status_rx: watch::Receiver<Status>,
        transcript_rx: watch::Receiver<String>,
        event_tx: broadcast::Sender<VoiceEvent>,
        supported: bool,
    ) -> Self {
        Self {
            tx,
            status_rx,
            transcript_rx,
            event_tx,
            supported,
        }
    }

    /// Current status
    pub fn status(&self) -> Status {
        *self.status_rx.borrow()
    }

    /// Observe status changes
    pub fn watch_status(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Last heard text; empty while a new session is listening
    pub fn transcript(&self) -> String {
        self.transcript_rx.borrow().clone()
    }

    /// Whether speech recognition is available at all
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.event_tx.subscribe()
    }

    /// Tap-to-speak. Ignored unless the controller is idle or speaking.
    pub fn start_listening(&self) -> Result<(), ControllerError> {
        self.send(Command::StartListening)
    }

    /// Ask the open session to stop. Ignored unless listening.
    pub fn stop_listening(&self) -> Result<(), ControllerError> {
        self.send(Command::StopListening)
    }

    /// Speak `text`, replacing anything already playing.
    ///
    /// The returned [`Completion`] resolves when the utterance concludes;
    /// dropping it is fine.
    pub fn speak(&self, text: impl Into<String>) -> Result<Completion, ControllerError> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Speak {
            text: text.into(),
            done: Some(done),
        })?;
        Ok(Completion { rx })
    }

    /// Register the navigation callback. A later registration replaces it.
    pub fn register_navigator(
        &self,
        navigator: impl Navigator + 'static,
    ) -> Result<(), ControllerError> {
        self.send(Command::RegisterNavigator(Box::new(navigator)))
    }

    fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.tx
            .send(ControllerEvent::Command(command))
            .map_err(|_| ControllerError::Stopped)
    }
}

/// Resolves with the outcome of one `speak` request
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<UtteranceOutcome>,
}

impl Future for Completion {
    type Output = UtteranceOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the controller went away mid-utterance
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(UtteranceOutcome::Interrupted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_handle() -> (VoiceHandle, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_, status_rx) = watch::channel(Status::Idle);
        let (_, transcript_rx) = watch::channel(String::new());
        let (event_tx, _) = broadcast::channel(4);
        (
            VoiceHandle::new(tx, status_rx, transcript_rx, event_tx, true),
            rx,
        )
    }

    #[test]
    fn test_commands_reach_the_loop() {
        let (handle, mut rx) = detached_handle();
        tokio_test::assert_ok!(handle.start_listening());
        assert!(matches!(
            rx.try_recv().unwrap(),
            ControllerEvent::Command(Command::StartListening)
        ));
    }

    #[test]
    fn test_stopped_controller_is_reported() {
        let (handle, rx) = detached_handle();
        drop(rx);
        assert_eq!(handle.start_listening(), Err(ControllerError::Stopped));
        assert!(handle.speak("hello").is_err());
    }

    #[tokio::test]
    async fn test_completion_without_answer_is_interrupted() {
        let (handle, mut rx) = detached_handle();
        let completion = handle.speak("hello").unwrap();

        // Drop the request, and with it the completion sender
        drop(rx.try_recv().unwrap());
        assert_eq!(completion.await, UtteranceOutcome::Interrupted);
    }
}
