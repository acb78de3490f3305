//! Command dispatcher
//!
//! Runs a classified action. Navigation and fixed replies resolve
//! synchronously into speech; questions go to the answerer on a spawned task
//! and come back as a `QueryResolved` event. Either way status ends up
//! passing through the player back to Idle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::outbox::Outbox;
use super::player::UtterancePlayer;
use super::ControllerEvent;
use crate::collab::{AnswerError, Navigator, Notification, QuestionAnswerer, Screen, Severity};
use crate::command::Action;
use crate::events::VoiceEvent;
use crate::status::{Status, StatusMachine};

pub(crate) const SOS_CANCELLED: &str = "SOS cancelled.";
pub(crate) const APOLOGY: &str = "Sorry, I couldn't get an answer right now. Please try again.";

/// Token identifying one AI query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(pub(crate) u64);

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "query#{}", self.0)
    }
}

/// Spoken confirmation after navigating
pub(crate) fn confirmation(screen: Screen) -> String {
    match screen {
        Screen::Dashboard => "Returning to dashboard.".to_string(),
        other => format!("Navigating to {}.", other.title()),
    }
}

pub(crate) fn not_understood(heard: &str) -> String {
    format!("Sorry, I didn't understand the command '{}'.", heard)
}

pub(crate) struct Dispatcher {
    navigator: Option<Box<dyn Navigator>>,
    answerer: Arc<dyn QuestionAnswerer>,
    pending: Option<QueryId>,
    next_id: u64,
    query_timeout: Option<Duration>,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl Dispatcher {
    pub(crate) fn new(
        answerer: Arc<dyn QuestionAnswerer>,
        query_timeout: Option<Duration>,
        tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            navigator: None,
            answerer,
            pending: None,
            next_id: 0,
            query_timeout,
            tx,
        }
    }

    pub(crate) fn register_navigator(&mut self, navigator: Box<dyn Navigator>) {
        if self.navigator.replace(navigator).is_some() {
            info!("navigator replaced");
        } else {
            debug!("navigator registered");
        }
    }

    pub(crate) fn query_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Where status returns once speech is over
    pub(crate) fn resting_status(&self) -> Status {
        if self.query_in_flight() {
            Status::Processing
        } else {
            Status::Idle
        }
    }

    /// Run `action`. Status is Processing on entry.
    pub(crate) fn dispatch(
        &mut self,
        action: Action,
        status: &mut StatusMachine,
        player: &mut UtterancePlayer,
        outbox: &Outbox,
    ) {
        info!(?action, "dispatching");
        match action {
            Action::Navigate(screen) => {
                match self.navigator.as_mut() {
                    Some(navigator) => navigator.navigate(screen),
                    None => warn!(%screen, "no navigator registered"),
                }
                outbox.emit(VoiceEvent::Navigated { screen });
                player.speak(confirmation(screen), None, status, self.resting_status());
            }
            Action::CancelSos => {
                player.speak(SOS_CANCELLED.to_string(), None, status, self.resting_status());
            }
            Action::AnswerQuery(query) => self.ask(query),
            Action::Unknown(heard) => {
                outbox.notify(Notification::new(
                    "Unknown Command",
                    format!("You said: \"{}\"", heard),
                    Severity::Info,
                ));
                player.speak(not_understood(&heard), None, status, self.resting_status());
            }
        }
    }

    fn ask(&mut self, query: String) {
        self.next_id += 1;
        let id = QueryId(self.next_id);
        self.pending = Some(id);
        info!(query_id = %id, %query, "query sent");

        let answerer = Arc::clone(&self.answerer);
        let tx = self.tx.clone();
        let limit = self.query_timeout;
        tokio::spawn(async move {
            let outcome = match limit {
                Some(limit) => tokio::time::timeout(limit, answerer.answer(&query))
                    .await
                    .unwrap_or_else(|_| Err(AnswerError::TimedOut(limit))),
                None => answerer.answer(&query).await,
            };
            let _ = tx.send(ControllerEvent::QueryResolved { query: id, outcome });
        });
    }

    pub(crate) fn on_query_resolved(
        &mut self,
        id: QueryId,
        outcome: Result<String, AnswerError>,
        status: &mut StatusMachine,
        player: &mut UtterancePlayer,
        outbox: &Outbox,
    ) {
        if self.pending != Some(id) {
            debug!(query_id = %id, "stale query result dropped");
            return;
        }
        self.pending = None;

        match outcome {
            Ok(answer) => {
                info!(query_id = %id, "answer received");
                player.speak(answer, None, status, Status::Idle);
            }
            Err(err) => {
                warn!(query_id = %id, %err, "query failed");
                outbox.notify(Notification::new(
                    "AI Error",
                    format!("Could not get an answer. Error: {}", err),
                    Severity::Destructive,
                ));
                player.speak(APOLOGY.to_string(), None, status, Status::Idle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmations_name_the_destination() {
        assert_eq!(
            confirmation(Screen::ObjectDetection),
            "Navigating to Object Detection."
        );
        assert_eq!(confirmation(Screen::Emergency), "Navigating to Emergency SOS.");
        assert_eq!(confirmation(Screen::Dashboard), "Returning to dashboard.");
    }

    #[test]
    fn test_not_understood_quotes_transcript() {
        assert_eq!(
            not_understood("blorp"),
            "Sorry, I didn't understand the command 'blorp'."
        );
    }
}
