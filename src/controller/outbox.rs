//! Outgoing notifications and observer events

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::collab::{Notification, Notifier};
use crate::events::VoiceEvent;

pub(crate) struct Outbox {
    notifier: Arc<dyn Notifier>,
    event_tx: broadcast::Sender<VoiceEvent>,
}

impl Outbox {
    pub(crate) fn new(
        notifier: Arc<dyn Notifier>,
        event_tx: broadcast::Sender<VoiceEvent>,
    ) -> Self {
        Self { notifier, event_tx }
    }

    /// Surface a notification to the host and to event subscribers
    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(&notification);
        self.emit(VoiceEvent::Notified { notification });
    }

    pub(crate) fn emit(&self, event: VoiceEvent) {
        let _ = self.event_tx.send(event);
    }
}
