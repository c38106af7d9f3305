use std::sync::Arc;

use async_trait::async_trait;
use pricewatch_core::config::TelegramConfig;
use pricewatch_core::{ChangeEvent, DeliveryError, NoopNotifier, Notifier};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::message::render_message;

#[derive(Debug, Error)]
pub enum TelegramInitError {
    #[error("telegram is enabled but `{0}` is not set")]
    Missing(&'static str),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Delivers change events through the Bot API `sendMessage` method.
#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    client: Client,
    api_base_url: String,
    bot_token: SecretString,
    chat_id: String,
    currency_symbol: String,
}

impl TelegramNotifier {
    pub fn from_config(config: &TelegramConfig) -> Result<Self, TelegramInitError> {
        let bot_token = config.bot_token.clone().ok_or(TelegramInitError::Missing("bot_token"))?;
        let chat_id = config
            .chat_id
            .clone()
            .filter(|chat_id| !chat_id.trim().is_empty())
            .ok_or(TelegramInitError::Missing("chat_id"))?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token,
            chat_id,
            currency_symbol: config.currency_symbol.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base_url, self.bot_token.expose_secret())
    }

    pub async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = SendMessage { chat_id: &self.chat_id, text, parse_mode: "HTML" };
        // reqwest errors embed the URL, which carries the bot token.
        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| DeliveryError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status: status.as_u16(), message });
        }

        debug!(event_name = "telegram.sent", chat_id = %self.chat_id, "telegram message sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), DeliveryError> {
        self.send_text(&render_message(event, &self.currency_symbol)).await
    }
}

/// Picks the Telegram sink when enabled, otherwise a no-op sink.
pub fn build_notifier(config: &TelegramConfig) -> Result<Arc<dyn Notifier>, TelegramInitError> {
    if !config.enabled {
        info!(
            event_name = "telegram.disabled",
            "telegram notifications disabled; price changes are only logged"
        );
        return Ok(Arc::new(NoopNotifier));
    }
    Ok(Arc::new(TelegramNotifier::from_config(config)?))
}
