// src/notify/email.rs

//! SMTP e-mail over STARTTLS.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::EmailConfig;
use crate::notify::NotificationChannel;

pub struct EmailChannel {
    config: EmailConfig,
    timeout: Duration,
}

impl EmailChannel {
    pub fn new(config: EmailConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Build the message without sending it.
    pub fn build_message(&self, message: &str, subject: &str) -> Result<Message> {
        let from: Mailbox = self
            .config
            .user
            .parse()
            .map_err(|e| AppError::notify("email", format!("invalid sender: {e}")))?;
        let to: Mailbox = self
            .config
            .to
            .parse()
            .map_err(|e| AppError::notify("email", format!("invalid recipient: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .map_err(|e| AppError::notify("email", e))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, message: &str, subject: &str) -> Result<()> {
        let email = self.build_message(message, subject)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
            .map_err(|e| AppError::notify("email", e))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.user.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| AppError::notify("email", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(to: &str) -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".into(),
            smtp_port: 587,
            user: "watcher@example.com".into(),
            password: "secret".into(),
            to: to.into(),
        }
    }

    #[test]
    fn test_build_message() {
        let channel = EmailChannel::new(config("me@example.com"), Duration::from_secs(10));
        let message = channel.build_message("body", "ROOMS AVAILABLE!").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: ROOMS AVAILABLE!"));
        assert!(raw.contains("To: me@example.com"));
    }

    #[test]
    fn test_invalid_recipient() {
        let channel = EmailChannel::new(config("not an address"), Duration::from_secs(10));
        let err = channel.build_message("body", "s").unwrap_err();
        assert!(matches!(err, AppError::Notify { .. }));
    }
}
