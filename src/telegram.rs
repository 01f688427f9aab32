use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient};
use tracing::{info, instrument};

use crate::error::MessageError;

/// Outbound text channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), MessageError>;
}

/// Sends plain text messages to one fixed Telegram chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat", &self.chat)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            bot: Bot::with_client(token, http),
            chat: parse_recipient(chat_id),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all)]
    async fn send(&self, text: &str) -> Result<(), MessageError> {
        self.bot
            .send_message(self.chat.clone(), text)
            .await
            .map_err(|err| MessageError(err.to_string()))?;
        info!(chars = text.chars().count(), "message sent");
        Ok(())
    }
}

/// Numeric ids address chats directly; anything else is a channel username.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if chat_id.starts_with('@') => Recipient::ChannelUsername(chat_id.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{}", chat_id)),
    }
}
