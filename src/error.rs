// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Maximum number of characters of an offending payload kept in errors.
pub const EXCERPT_LEN: usize = 200;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed (timeout, connection, non-2xx)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response did not have the expected shape
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// A notification channel failed to deliver
    #[error("Notification via {channel} failed: {message}")]
    Notify { channel: String, message: String },

    /// Snapshot could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a shape/parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a shape/parse error that quotes a bounded excerpt of the payload.
    pub fn parse_with_excerpt(
        context: impl Into<String>,
        message: impl fmt::Display,
        payload: &str,
    ) -> Self {
        Self::Parse {
            context: context.into(),
            message: format!("{message} (payload: {:?})", excerpt(payload)),
        }
    }

    /// Create a notification channel error.
    pub fn notify(channel: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notify {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

/// Truncate `payload` to at most [`EXCERPT_LEN`] characters.
pub fn excerpt(payload: &str) -> &str {
    match payload.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => &payload[..idx],
        None => payload,
    }
}
