//! Telegram adapter (teloxide).
//!
//! Implements the `nrelay-core` [`ChannelSender`] over the Bot API `sendMessage`
//! call with HTML parse mode.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ParseMode, Recipient},
};

use nrelay_core::{
    config::TelegramConfig, domain::Channel, errors::Error, ports::ChannelSender, Result,
};

#[derive(Clone)]
pub struct TelegramSender {
    /// `None` when no bot token is configured; every send then fails.
    bot: Option<Bot>,
}

impl TelegramSender {
    pub fn new(cfg: &TelegramConfig, timeout: Duration) -> Result<Self> {
        if cfg.bot_token.is_empty() {
            return Ok(Self { bot: None });
        }

        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("telegram http client: {e}")))?;
        let mut bot = Bot::with_client(cfg.bot_token.clone(), client);

        if let Some(api_url) = &cfg.api_url {
            let url = reqwest::Url::parse(api_url)
                .map_err(|e| Error::Config(format!("TELEGRAM_API_URL: {e}")))?;
            bot = bot.set_api_url(url);
        }

        Ok(Self { bot: Some(bot) })
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Delivery(format!("telegram error: {e}"))
    }
}

/// Numeric ids address chats directly; anything else is a channel username.
fn recipient_for(raw: &str) -> Recipient {
    match raw.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(teloxide::types::ChatId(id)),
        Err(_) => Recipient::ChannelUsername(raw.trim().to_string()),
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<()> {
        let Some(bot) = &self.bot else {
            return Err(Error::Delivery("Telegram token not configured".to_string()));
        };

        bot.send_message(recipient_for(recipient), message.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
