use std::sync::Arc;

use tracing::{debug, error, info, warn};

use common::{Error, MessageId, NotificationTransport, Result};

/// What `update_status` did with the status slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Created(MessageId),
    Edited(MessageId),
    /// The edit failed and a fresh message took the slot.
    Replaced(MessageId),
    NotDelivered,
}

impl StatusOutcome {
    pub fn delivered(&self) -> bool {
        !matches!(self, StatusOutcome::NotDelivered)
    }
}

/// Keeps at most one live message per slot on the transport.
///
/// The status slot is edited in place so routine refreshes stay silent.
/// The alert slot is replaced (delete, then send) so every alert notifies.
pub struct NotificationLifecycleManager {
    transport: Arc<dyn NotificationTransport>,
    status_slot: Option<MessageId>,
    alert_slot: Option<MessageId>,
}

impl NotificationLifecycleManager {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            transport,
            status_slot: None,
            alert_slot: None,
        }
    }

    pub fn status_slot(&self) -> Option<MessageId> {
        self.status_slot
    }

    pub fn alert_slot(&self) -> Option<MessageId> {
        self.alert_slot
    }

    pub async fn update_status(&mut self, content: &str) -> StatusOutcome {
        if let Some(id) = self.status_slot {
            match self.transport.edit(id, content).await {
                Ok(()) => {
                    debug!(message_id = %id, "Status message edited");
                    return StatusOutcome::Edited(id);
                }
                Err(e) => {
                    warn!(message_id = %id, error = %e, "Status edit failed, sending a replacement");
                }
            }
        }

        let replacing = self.status_slot.is_some();
        match self.transport.send(content).await {
            Ok(id) => {
                self.status_slot = Some(id);
                info!(message_id = %id, "Status message sent");
                if replacing {
                    StatusOutcome::Replaced(id)
                } else {
                    StatusOutcome::Created(id)
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to send status message");
                StatusOutcome::NotDelivered
            }
        }
    }

    /// Replace the live alert message with `content`.
    ///
    /// A failed delete of the previous alert is logged and does not stop the
    /// send. A failed send leaves the slot unchanged and is returned as
    /// `Error::AlertNotDelivered`.
    pub async fn fire_alert(&mut self, content: &str) -> Result<MessageId> {
        if let Some(old) = self.alert_slot {
            match self.transport.delete(old).await {
                Ok(()) => debug!(message_id = %old, "Previous alert message deleted"),
                Err(e) => warn!(message_id = %old, error = %e, "Failed to delete previous alert"),
            }
        }

        match self.transport.send(content).await {
            Ok(id) => {
                self.alert_slot = Some(id);
                info!(message_id = %id, "Alert message sent");
                Ok(id)
            }
            Err(e) => {
                error!(error = %e, "Failed to send alert message");
                Err(Error::AlertNotDelivered(e.to_string()))
            }
        }
    }
}
