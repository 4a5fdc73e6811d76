// src/notify/telegram.rs

//! Telegram Bot API `sendMessage`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::TelegramConfig;
use crate::notify::{NotificationChannel, post_json};

const HEADER: &str = "🏨 *Hotel Room Alert*";

pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    pub fn payload(&self, message: &str) -> Value {
        json!({
            "chat_id": self.config.chat_id,
            "text": format!("{HEADER}\n\n{message}"),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str, _subject: &str) -> Result<()> {
        post_json(&self.client, &self.endpoint(), &self.payload(message)).await
    }
}
