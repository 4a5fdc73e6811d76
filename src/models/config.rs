//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{BackendConfig, LegacyHtmlBackend, LegacyMarkup, StockQueryBackend};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Polling loop and snapshot settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// HTTP client behavior settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Reservation backends, polled in order
    #[serde(default = "defaults::backends")]
    pub backends: Vec<BackendConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.monitor.check_interval_secs == 0 {
            return Err(AppError::validation(
                "monitor.check_interval_secs must be > 0",
            ));
        }
        if self.monitor.error_backoff_secs < self.monitor.check_interval_secs {
            return Err(AppError::validation(
                "monitor.error_backoff_secs must not be shorter than check_interval_secs",
            ));
        }
        if self.backends.is_empty() {
            return Err(AppError::validation("No backends defined"));
        }

        for backend in &self.backends {
            let name = backend.name();
            if name.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "{} backend has an empty name",
                    backend.kind()
                )));
            }
            url::Url::parse(backend.endpoint()).map_err(|e| {
                AppError::validation(format!("{name}: invalid endpoint URL: {e}"))
            })?;
            if backend.target_dates().is_empty() {
                return Err(AppError::validation(format!(
                    "{name}: no target dates configured"
                )));
            }
            if let BackendConfig::CalendarWidget(widget) = backend {
                if !(1..=12).contains(&widget.month) {
                    return Err(AppError::validation(format!(
                        "{name}: month must be in 1..=12"
                    )));
                }
            }
        }

        Ok(())
    }

    /// All target dates across backends, sorted and deduplicated.
    pub fn all_target_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .backends
            .iter()
            .flat_map(|b| b.target_dates().iter().copied())
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            http: HttpConfig::default(),
            backends: defaults::backends(),
        }
    }
}

/// Polling loop and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between check cycles
    #[serde(default = "defaults::check_interval")]
    pub check_interval_secs: u64,

    /// Seconds to wait after a cycle failed unexpectedly
    #[serde(default = "defaults::error_backoff")]
    pub error_backoff_secs: u64,

    /// Pause between two backends in milliseconds
    #[serde(default = "defaults::backend_delay")]
    pub backend_delay_ms: u64,

    /// Snapshot file path
    #[serde(default = "defaults::state_file")]
    pub state_file: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: defaults::check_interval(),
            error_backoff_secs: defaults::error_backoff(),
            backend_delay_ms: defaults::backend_delay(),
            state_file: defaults::state_file(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Timeout for notification webhooks in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub notify_timeout_secs: u64,

    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    #[serde(default)]
    pub referer: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            notify_timeout_secs: defaults::notify_timeout(),
            accept_language: defaults::accept_language(),
            referer: None,
        }
    }
}

mod defaults {
    use super::*;

    // Monitor defaults
    pub fn check_interval() -> u64 {
        300
    }
    pub fn error_backoff() -> u64 {
        600
    }
    pub fn backend_delay() -> u64 {
        2000
    }
    pub fn state_file() -> String {
        "monitor_state.json".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn notify_timeout() -> u64 {
        10
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.9,ja;q=0.8".into()
    }

    // Backend defaults
    pub fn backends() -> Vec<BackendConfig> {
        let target_dates = vec![
            NaiveDate::from_ymd_opt(2025, 10, 24).unwrap_or_default(),
            NaiveDate::from_ymd_opt(2025, 10, 25).unwrap_or_default(),
        ];
        let booking_url = "https://www.489pro.com/asp/489/menu.asp?id=20000122&ty=ser".to_string();

        vec![
            BackendConfig::StockQuery(StockQueryBackend {
                name: "Taisho-ike".to_string(),
                api_url: "https://www2.489pro.com/www1/api/ypro/v2plus/ypro_stocksearch_api.asp"
                    .to_string(),
                hotel_id: "20000122".to_string(),
                plan_id: "2".to_string(),
                guests: 2,
                lang: "JPN".to_string(),
                price_field: None,
                target_dates: target_dates.clone(),
                booking_url: Some(booking_url.clone()),
            }),
            BackendConfig::LegacyHtml(LegacyHtmlBackend {
                name: "Taisho-ike (calendar)".to_string(),
                url: booking_url.clone(),
                target_dates,
                booking_url: Some(booking_url),
                max_nav_steps: 15,
                nav_delay_ms: 1000,
                markup: LegacyMarkup::default(),
            }),
        ]
    }
}
