use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use common::{Error, MessageId, NotificationTransport, Result};

/// Transport used when no chat is configured.
///
/// Messages are written to the log under target `console` instead of being
/// delivered anywhere. Ids are issued sequentially and the live messages are
/// kept so edits and deletes behave like a real chat.
pub struct ConsoleTransport {
    messages: RwLock<HashMap<MessageId, String>>,
    next_id: RwLock<i32>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        info!("No chat configured, notifications go to the console log");
        Self {
            messages: RwLock::new(HashMap::new()),
            next_id: RwLock::new(0),
        }
    }

    /// Current text of a live message.
    pub async fn message(&self, id: MessageId) -> Option<String> {
        self.messages.read().await.get(&id).cloned()
    }

    pub async fn live_messages(&self) -> usize {
        self.messages.read().await.len()
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTransport for ConsoleTransport {
    async fn send(&self, content: &str) -> Result<MessageId> {
        let id = {
            let mut next = self.next_id.write().await;
            *next += 1;
            MessageId(*next)
        };
        info!(target: "console", message_id = %id, "\n{content}");
        self.messages.write().await.insert(id, content.to_string());
        Ok(id)
    }

    async fn edit(&self, id: MessageId, content: &str) -> Result<()> {
        let mut messages = self.messages.write().await;
        let slot = messages
            .get_mut(&id)
            .ok_or_else(|| Error::Transport(format!("message {id} not found")))?;
        *slot = content.to_string();
        info!(target: "console", message_id = %id, "(edited)\n{content}");
        Ok(())
    }

    async fn delete(&self, id: MessageId) -> Result<()> {
        self.messages
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| Error::Transport(format!("message {id} not found")))?;
        info!(target: "console", message_id = %id, "(deleted)");
        Ok(())
    }
}
