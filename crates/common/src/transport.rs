use async_trait::async_trait;

use crate::{MessageId, Result};

/// Send/edit/delete primitives of a chat channel.
///
/// `TelegramTransport` implements this for the real bot.
/// `ConsoleTransport` implements this for running without a chat.
///
/// Each call may fail independently. Callers treat errors as values and
/// decide locally whether a failure matters.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Post a new message and return its id. Produces a user notification.
    async fn send(&self, content: &str) -> Result<MessageId>;

    /// Replace the text of an existing message. Silent for the user.
    async fn edit(&self, id: MessageId, content: &str) -> Result<()>;

    /// Remove a message.
    async fn delete(&self, id: MessageId) -> Result<()>;
}
