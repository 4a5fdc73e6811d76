// src/notify/pushover.rs

//! Pushover messages API.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::PushoverConfig;
use crate::notify::NotificationChannel;

/// High priority: bypasses the user's quiet hours.
const PRIORITY: &str = "1";

pub struct PushoverChannel {
    config: PushoverConfig,
    client: Client,
}

impl PushoverChannel {
    pub fn new(config: PushoverConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn form<'a>(&'a self, message: &'a str, subject: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("token", self.config.token.as_str()),
            ("user", self.config.user.as_str()),
            ("message", message),
            ("title", subject),
            ("priority", PRIORITY),
        ]
    }
}

#[async_trait]
impl NotificationChannel for PushoverChannel {
    fn name(&self) -> &'static str {
        "pushover"
    }

    async fn send(&self, message: &str, subject: &str) -> Result<()> {
        self.client
            .post(&self.config.api_url)
            .form(&self.form(message, subject))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
