// src/notify/webhook.rs

//! Discord and Slack incoming webhooks.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::Result;
use crate::notify::{NotificationChannel, post_json};

/// Discord rejects `content` longer than this.
const DISCORD_CONTENT_LIMIT: usize = 2000;

/// Embed colour (green).
const DISCORD_COLOR: u32 = 0x00ff00;

pub struct DiscordChannel {
    url: String,
    client: Client,
}

impl DiscordChannel {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

pub fn discord_payload(message: &str, subject: &str) -> Value {
    json!({
        "content": truncate(message, DISCORD_CONTENT_LIMIT),
        "embeds": [{
            "title": subject,
            "description": message,
            "color": DISCORD_COLOR,
            "timestamp": Utc::now().to_rfc3339(),
        }]
    })
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, message: &str, subject: &str) -> Result<()> {
        post_json(&self.client, &self.url, &discord_payload(message, subject)).await
    }
}

pub struct SlackChannel {
    url: String,
    client: Client,
}

impl SlackChannel {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

pub fn slack_payload(message: &str, subject: &str) -> Value {
    json!({
        "text": subject,
        "blocks": [{
            "type": "section",
            "text": { "type": "mrkdwn", "text": message }
        }]
    })
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, message: &str, subject: &str) -> Result<()> {
        post_json(&self.client, &self.url, &slack_payload(message, subject)).await
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discord_payload_shape() {
        let payload = discord_payload("body", "ROOMS AVAILABLE! 1 new options");
        assert_eq!(payload["content"], "body");
        assert_eq!(payload["embeds"][0]["title"], "ROOMS AVAILABLE! 1 new options");
        assert_eq!(payload["embeds"][0]["color"], 0x00ff00);
        assert!(payload["embeds"][0]["timestamp"].is_string());
    }

    #[test]
    fn test_discord_content_is_bounded() {
        let long = "空".repeat(3000);
        let payload = discord_payload(&long, "s");
        assert_eq!(
            payload["content"].as_str().unwrap().chars().count(),
            DISCORD_CONTENT_LIMIT
        );
    }

    #[test]
    fn test_slack_payload_shape() {
        let payload = slack_payload("*body*", "subject");
        assert_eq!(payload["text"], "subject");
        assert_eq!(payload["blocks"][0]["text"]["type"], "mrkdwn");
        assert_eq!(payload["blocks"][0]["text"]["text"], "*body*");
    }
}
