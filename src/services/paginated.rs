// src/services/paginated.rs

//! Paginated JSON stock adapter.
//!
//! Same stock API as [`crate::services::StockQueryAdapter`], but answered
//! as plain JSON and fetched one calendar week per page, covering every
//! week that holds a target date.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{RoomRecord, StockQueryBackend};
use crate::services::BackendAdapter;
use crate::services::jsonp::parse_jsonp;
use crate::services::stock::{parse_stock_document, query_params, week_range};
use crate::utils::http::fetch_text_with_query;

/// Adapter for the week-paged JSON stock API.
pub struct PaginatedJsonAdapter {
    backend: StockQueryBackend,
    client: Client,
}

impl PaginatedJsonAdapter {
    pub fn new(backend: StockQueryBackend, client: Client) -> Self {
        Self { backend, client }
    }

    /// Mondays of every week from the earliest to the latest target date.
    pub fn week_starts(targets: &BTreeSet<NaiveDate>) -> Vec<NaiveDate> {
        let (Some(first), Some(last)) = (targets.first(), targets.last()) else {
            return Vec::new();
        };

        let (mut monday, _) = week_range(*first);
        let (last_monday, _) = week_range(*last);
        let mut weeks = Vec::new();
        while monday <= last_monday {
            weeks.push(monday);
            monday += Duration::days(7);
        }
        weeks
    }

    async fn fetch_page(
        &self,
        monday: NaiveDate,
        targets: &BTreeSet<NaiveDate>,
    ) -> Result<Vec<RoomRecord>> {
        let sunday = monday + Duration::days(6);
        let params = query_params(&self.backend, monday, sunday, Utc::now().timestamp_millis());
        let body = fetch_text_with_query(&self.client, &self.backend.api_url, &params).await?;
        let doc = parse_page(&body)?;
        parse_stock_document(&doc, &self.backend, targets)
    }
}

/// Parse a page body: plain JSON first, tolerating a stray envelope.
fn parse_page(body: &str) -> Result<Value> {
    match serde_json::from_str(body.trim()) {
        Ok(value) => Ok(value),
        Err(json_err) => parse_jsonp(body).map_err(|_| {
            AppError::parse_with_excerpt(
                "paginated_json",
                format!("page is not JSON: {json_err}"),
                body,
            )
        }),
    }
}

#[async_trait]
impl BackendAdapter for PaginatedJsonAdapter {
    fn name(&self) -> &str {
        &self.backend.name
    }

    fn kind(&self) -> &'static str {
        "paginated_json"
    }

    async fn fetch(&self) -> Result<Vec<RoomRecord>> {
        let targets: BTreeSet<_> = self.backend.target_dates.iter().copied().collect();
        let weeks = Self::week_starts(&targets);
        if weeks.is_empty() {
            return Err(AppError::config(format!("{}: no target dates", self.backend.name)));
        }

        let mut records = Vec::new();
        let mut last_error = None;
        let mut pages_ok = 0usize;

        for monday in &weeks {
            match self.fetch_page(*monday, &targets).await {
                Ok(page) => {
                    pages_ok += 1;
                    records.extend(page);
                }
                Err(e) => {
                    log::warn!("{}: week of {} failed: {}", self.backend.name, monday, e);
                    last_error = Some(e);
                }
            }
        }

        match (pages_ok, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(records),
        }
    }
}
