use async_trait::async_trait;
use teloxide::{
    payloads::{EditMessageTextSetters, SendMessageSetters},
    requests::Requester,
    types::{ChatId, ParseMode},
    ApiError, Bot, RequestError,
};
use tracing::{debug, info};

use common::{Error, MessageId, NotificationTransport, Result, TelegramSettings};

/// Delivers tracker messages to a single Telegram chat as HTML.
pub struct TelegramTransport {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramTransport {
    pub fn new(settings: &TelegramSettings) -> Self {
        info!(chat_id = settings.chat_id, "Telegram transport configured");
        Self {
            bot: Bot::new(settings.token.clone()),
            chat_id: ChatId(settings.chat_id),
        }
    }
}

fn transport_error(op: &str, e: RequestError) -> Error {
    Error::Transport(format!("Telegram {op} failed: {e}"))
}

#[async_trait]
impl NotificationTransport for TelegramTransport {
    async fn send(&self, content: &str) -> Result<MessageId> {
        let msg = self
            .bot
            .send_message(self.chat_id, content)
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .await
            .map_err(|e| transport_error("send", e))?;
        debug!(message_id = msg.id.0, "Telegram message sent");
        Ok(MessageId(msg.id.0))
    }

    async fn edit(&self, id: MessageId, content: &str) -> Result<()> {
        let result = self
            .bot
            .edit_message_text(self.chat_id, teloxide::types::MessageId(id.0), content)
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .await;
        match result {
            Ok(_) => Ok(()),
            // identical content still counts as a successful refresh
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(transport_error("edit", e)),
        }
    }

    async fn delete(&self, id: MessageId) -> Result<()> {
        self.bot
            .delete_message(self.chat_id, teloxide::types::MessageId(id.0))
            .await
            .map_err(|e| transport_error("delete", e))?;
        Ok(())
    }
}
