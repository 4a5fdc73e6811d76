// src/services/adapter.rs

//! Backend adapter interface and the fail-soft boundary around it.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{BackendConfig, RoomRecord};
use crate::services::{
    CalendarWidgetAdapter, LegacyHtmlAdapter, PaginatedJsonAdapter, StockQueryAdapter,
};

/// Fetches one backend and converts its response into normalized records.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Backend display name.
    fn name(&self) -> &str;

    /// Adapter variant tag.
    fn kind(&self) -> &'static str;

    /// Fetch and parse. Errors are surfaced here and absorbed by
    /// [`fetch_and_parse`].
    async fn fetch(&self) -> Result<Vec<RoomRecord>>;
}

/// Build the adapter for a backend configuration.
pub fn build_adapter(config: &BackendConfig, client: &Client) -> Box<dyn BackendAdapter> {
    match config {
        BackendConfig::PaginatedJson(b) => {
            Box::new(PaginatedJsonAdapter::new(b.clone(), client.clone()))
        }
        BackendConfig::StockQuery(b) => Box::new(StockQueryAdapter::new(b.clone(), client.clone())),
        BackendConfig::CalendarWidget(b) => {
            Box::new(CalendarWidgetAdapter::new(b.clone(), client.clone()))
        }
        BackendConfig::LegacyHtml(b) => Box::new(LegacyHtmlAdapter::new(b.clone(), client.clone())),
    }
}

/// Result of polling one backend.
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    pub name: String,
    pub kind: &'static str,
    pub records: Vec<RoomRecord>,
    /// Set when the backend failed and contributed no records
    pub error: Option<String>,
}

impl BackendOutcome {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Poll one backend without ever propagating its failure.
pub async fn fetch_and_parse(adapter: &dyn BackendAdapter) -> BackendOutcome {
    log::info!("Checking {} ({})", adapter.name(), adapter.kind());

    match adapter.fetch().await {
        Ok(records) => {
            log::info!("{}: {} records", adapter.name(), records.len());
            BackendOutcome {
                name: adapter.name().to_string(),
                kind: adapter.kind(),
                records,
                error: None,
            }
        }
        Err(e) => {
            log::error!("{} failed, treating as no records: {}", adapter.name(), e);
            BackendOutcome {
                name: adapter.name().to_string(),
                kind: adapter.kind(),
                records: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}
