//! Fan-out of change notifications to every configured channel.
//!
//! Channels are attempted in a fixed order (email, discord, slack,
//! pushover, telegram). A failing channel is logged and recorded in the
//! [`DispatchReport`]; it never stops the remaining channels and never
//! fails the check cycle.

#[cfg(feature = "email")]
mod email;
mod message;
mod pushover;
mod telegram;
mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::Result;
use crate::models::NotifyConfig;

#[cfg(feature = "email")]
pub use email::EmailChannel;
pub use message::{MessageContext, format_message, subject};
pub use pushover::PushoverChannel;
pub use telegram::TelegramChannel;
pub use webhook::{DiscordChannel, SlackChannel, discord_payload, slack_payload};

/// One delivery mechanism.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str, subject: &str) -> Result<()>;
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: Vec<String>,
    /// `(channel, error message)`
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn all_failed(&self) -> bool {
        self.sent.is_empty() && !self.failed.is_empty()
    }
}

pub struct Dispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Build every channel whose credentials are present.
    pub fn from_config(config: &NotifyConfig, client: Client, timeout: Duration) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if let Some(email) = &config.email {
            #[cfg(feature = "email")]
            channels.push(Box::new(EmailChannel::new(email.clone(), timeout)));
            #[cfg(not(feature = "email"))]
            {
                let _ = (email, timeout);
                log::warn!("E-mail is configured but this build lacks the `email` feature");
            }
        }
        if let Some(discord) = &config.discord {
            channels.push(Box::new(DiscordChannel::new(&discord.url, client.clone())));
        }
        if let Some(slack) = &config.slack {
            channels.push(Box::new(SlackChannel::new(&slack.url, client.clone())));
        }
        if let Some(pushover) = &config.pushover {
            channels.push(Box::new(PushoverChannel::new(pushover.clone(), client.clone())));
        }
        if let Some(telegram) = &config.telegram {
            channels.push(Box::new(TelegramChannel::new(telegram.clone(), client)));
        }

        Self::new(channels)
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send to every channel in order.
    pub async fn notify(&self, message: &str, subject: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        if self.channels.is_empty() {
            log::warn!("No notification channels configured; change not delivered");
            return report;
        }

        for channel in &self.channels {
            match channel.send(message, subject).await {
                Ok(()) => {
                    log::info!("Notification sent via {}", channel.name());
                    report.sent.push(channel.name().to_string());
                }
                Err(e) => {
                    log::error!("Notification via {} failed: {}", channel.name(), e);
                    report.failed.push((channel.name().to_string(), e.to_string()));
                }
            }
        }

        report
    }
}

/// POST a JSON body and require a 2xx answer.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &T,
) -> Result<()> {
    client
        .post(url)
        .json(body)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
