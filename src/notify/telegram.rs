use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::TelegramConfig;
use crate::notify::Notifier;

const API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Posts messages to one Telegram channel through the Bot API.
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

/// Accept `@name`, `name`, or a `t.me/name` link and return the chat id form.
pub fn normalize_channel_username(channel: &str) -> String {
    let raw = channel.trim();
    match raw.split_once("t.me/") {
        Some((_, segment)) => {
            let segment = segment.trim().trim_matches('/');
            if segment.starts_with('@') {
                segment.to_string()
            } else {
                format!("@{}", segment)
            }
        }
        None => raw.to_string(),
    }
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, channel: &str) -> Self {
        Self {
            client: Client::new(),
            bot_token: bot_token.trim().to_string(),
            chat_id: normalize_channel_username(channel),
        }
    }

    /// None when the token or the channel is missing.
    pub fn from_config(cfg: &TelegramConfig) -> Option<Self> {
        if !cfg.is_configured() {
            return None;
        }
        Some(Self::new(&cfg.bot_token, &cfg.channel_username))
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };

        let resp = self
            .client
            .post(format!("{}/bot{}/sendMessage", API_URL, self.bot_token))
            .json(&body)
            .send()
            .await
            .context("Failed to reach Telegram")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram error {}: {}", status, body);
        }

        info!("Telegram message sent to {}", self.chat_id);
        Ok(())
    }
}
