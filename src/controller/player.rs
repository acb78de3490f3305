//! Utterance player
//!
//! Wraps the synthesizer and keeps at most one utterance alive. Every
//! `speak` cancels whatever is playing or scheduled first; the replaced
//! utterance resolves `Superseded` before the new one can start, and any
//! late engine callback for it carries a stale token and is dropped.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{ControllerEvent, UtteranceOutcome};
use crate::engine::{SpeechSynthesizer, SynthesisEvent, SynthesisSignal, SynthesisSink, UtteranceId};
use crate::status::{Status, StatusMachine};

struct Utterance {
    id: UtteranceId,
    text: String,
    done: Option<oneshot::Sender<UtteranceOutcome>>,
    retries_left: u8,
}

impl Utterance {
    fn resolve(mut self, outcome: UtteranceOutcome) {
        resolve(self.done.take(), outcome);
    }
}

fn resolve(done: Option<oneshot::Sender<UtteranceOutcome>>, outcome: UtteranceOutcome) {
    if let Some(done) = done {
        // The caller may have stopped waiting
        let _ = done.send(outcome);
    }
}

pub(crate) struct UtterancePlayer {
    engine: Box<dyn SpeechSynthesizer>,
    supported: bool,
    current: Option<Utterance>,
    next_id: u64,
    speak_delay: Duration,
    retry_backoff: Duration,
    max_retries: u8,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl UtterancePlayer {
    pub(crate) fn new(
        engine: Box<dyn SpeechSynthesizer>,
        speak_delay: Duration,
        retry_backoff: Duration,
        max_retries: u8,
        tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        let supported = engine.is_supported();
        if !supported {
            warn!("speech synthesis not supported, utterances will be skipped");
        }
        Self {
            engine,
            supported,
            current: None,
            next_id: 0,
            speak_delay,
            retry_backoff,
            max_retries,
            tx,
        }
    }

    /// Replace whatever is playing with `text`.
    ///
    /// `rest` is the status to return to once speech is over.
    pub(crate) fn speak(
        &mut self,
        text: String,
        done: Option<oneshot::Sender<UtteranceOutcome>>,
        status: &mut StatusMachine,
        rest: Status,
    ) {
        if status.status() == Status::Listening {
            debug!("speak refused while listening");
            resolve(done, UtteranceOutcome::Skipped);
            return;
        }

        self.preempt(UtteranceOutcome::Superseded);
        self.engine.cancel_all();

        if text.trim().is_empty() || !self.supported {
            debug!(supported = self.supported, "utterance skipped");
            Self::settle(status, rest);
            resolve(done, UtteranceOutcome::Skipped);
            return;
        }

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        debug!(utterance = %id, %text, "utterance scheduled");
        self.current = Some(Utterance {
            id,
            text,
            done,
            retries_left: self.max_retries,
        });
        self.schedule(id, self.speak_delay);
    }

    /// Barge-in: drop the current utterance without touching status.
    /// Returns whether anything was cancelled.
    pub(crate) fn cancel(&mut self) -> bool {
        let cancelled = self.preempt(UtteranceOutcome::Interrupted);
        self.engine.cancel_all();
        cancelled
    }

    /// The scheduling delay or retry backoff for `id` elapsed
    pub(crate) fn on_due(&mut self, id: UtteranceId) {
        match &self.current {
            Some(utterance) if utterance.id == id => {
                let sink = SynthesisSink::new(id, self.tx.clone());
                self.engine.speak(&utterance.text, sink);
            }
            _ => debug!(utterance = %id, "stale utterance schedule dropped"),
        }
    }

    pub(crate) fn on_event(
        &mut self,
        event: SynthesisEvent,
        status: &mut StatusMachine,
        rest: Status,
    ) {
        let Some(current) = self.current.as_mut().filter(|u| u.id == event.utterance) else {
            debug!(
                utterance = %event.utterance,
                signal = ?event.signal,
                "stale synthesis event dropped"
            );
            return;
        };

        match event.signal {
            SynthesisSignal::Started => {
                if let Err(err) = status.begin_speaking() {
                    warn!(
                        %err,
                        utterance = %event.utterance,
                        "utterance started outside a speakable status"
                    );
                }
            }
            SynthesisSignal::Ended => {
                Self::settle(status, rest);
                if let Some(utterance) = self.current.take() {
                    utterance.resolve(UtteranceOutcome::Completed);
                }
            }
            SynthesisSignal::Error(kind) if current.retries_left > 0 => {
                // Some engines report an error right after a legitimate cancel
                current.retries_left -= 1;
                debug!(utterance = %event.utterance, %kind, "synthesis error, retrying");
                let id = current.id;
                self.schedule(id, self.retry_backoff);
            }
            SynthesisSignal::Error(kind) => {
                warn!(utterance = %event.utterance, %kind, "utterance failed");
                Self::settle(status, rest);
                if let Some(utterance) = self.current.take() {
                    utterance.resolve(UtteranceOutcome::Failed);
                }
            }
        }
    }

    fn preempt(&mut self, outcome: UtteranceOutcome) -> bool {
        match self.current.take() {
            Some(utterance) => {
                info!(utterance = %utterance.id, ?outcome, "utterance pre-empted");
                utterance.resolve(outcome);
                true
            }
            None => false,
        }
    }

    fn settle(status: &mut StatusMachine, rest: Status) {
        if let Err(err) = status.settle(rest) {
            debug!(%err, "status left as is after speech");
        }
    }

    fn schedule(&self, id: UtteranceId, delay: Duration) {
        if delay.is_zero() {
            let _ = self.tx.send(ControllerEvent::UtteranceDue(id));
            return;
        }
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControllerEvent::UtteranceDue(id));
        });
    }
}
