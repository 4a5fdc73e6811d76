// src/models/notify.rs

//! Notification channel credentials.
//!
//! A channel is enabled purely by the presence of its required values;
//! anything missing leaves it disabled, never in error.

/// Credentials for every supported channel.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub email: Option<EmailConfig>,
    pub discord: Option<WebhookConfig>,
    pub slack: Option<WebhookConfig>,
    pub pushover: Option<PushoverConfig>,
    pub telegram: Option<TelegramConfig>,
}

/// SMTP delivery settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub user: String,
    pub password: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PushoverConfig {
    pub token: String,
    pub user: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

impl NotifyConfig {
    /// Read channel settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read channel settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let email = match (get("EMAIL_USER"), get("EMAIL_PASS"), get("NOTIFY_EMAIL")) {
            (Some(user), Some(password), Some(to)) => Some(EmailConfig {
                smtp_server: get("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.into()),
                smtp_port: get("SMTP_PORT")
                    .and_then(|p| p.trim().parse().ok())
                    .unwrap_or(DEFAULT_SMTP_PORT),
                user,
                password,
                to,
            }),
            _ => None,
        };

        let pushover = match (get("PUSHOVER_TOKEN"), get("PUSHOVER_USER")) {
            (Some(token), Some(user)) => Some(PushoverConfig {
                token,
                user,
                api_url: PUSHOVER_API_URL.into(),
            }),
            _ => None,
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                api_base: TELEGRAM_API_BASE.into(),
            }),
            _ => None,
        };

        Self {
            email,
            discord: get("DISCORD_WEBHOOK").map(|url| WebhookConfig { url }),
            slack: get("SLACK_WEBHOOK").map(|url| WebhookConfig { url }),
            pushover,
            telegram,
        }
    }

    /// Names of the channels that will be attempted.
    pub fn enabled_channels(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.email.is_some() {
            names.push("email");
        }
        if self.discord.is_some() {
            names.push("discord");
        }
        if self.slack.is_some() {
            names.push("slack");
        }
        if self.pushover.is_some() {
            names.push("pushover");
        }
        if self.telegram.is_some() {
            names.push("telegram");
        }
        names
    }
}
