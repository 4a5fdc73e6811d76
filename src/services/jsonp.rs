// src/services/jsonp.rs

//! JSONP stock-query adapter.
//!
//! The stock API answers with a function-call envelope whose name differs
//! between deployments (`jsonp1700000000000(...)`, `getStockData(...);`).
//! The payload inside is not strict JSON either: it may use single quotes,
//! HTML entities and raw control characters.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{RoomRecord, StockQueryBackend};
use crate::services::BackendAdapter;
use crate::services::stock::{parse_stock_document, query_params, week_range};
use crate::utils::http::fetch_text_with_query;

/// First `name(` whose argument is an object or array literal. Guards such
/// as `typeof cb === 'function' &&` and `try { ... } catch` wrappers may
/// surround the call.
static ENVELOPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)([A-Za-z_$][\w$.]*)\s*\(\s*([\{\[].*[\}\]])\s*\)")
        .expect("valid envelope regex")
});

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1f\x7f-\u{9f}]").expect("valid control regex"));

/// Locate the function-call envelope and return `(callback, payload)`.
pub fn extract_envelope(body: &str) -> Result<(&str, &str)> {
    let caps = ENVELOPE.captures(body).ok_or_else(|| {
        AppError::parse_with_excerpt("jsonp", "no function-call envelope found", body)
    })?;

    match (caps.get(1), caps.get(2)) {
        (Some(name), Some(payload)) => Ok((name.as_str(), payload.as_str())),
        _ => Err(AppError::parse_with_excerpt(
            "jsonp",
            "incomplete envelope",
            body,
        )),
    }
}

/// Make an envelope payload parseable: single quotes become double quotes,
/// HTML entities are decoded and raw control characters are dropped.
pub fn clean_payload(payload: &str) -> String {
    let quoted = payload.replace('\'', "\"");
    let decoded = html_escape::decode_html_entities(&quoted);
    CONTROL_CHARS.replace_all(&decoded, "").into_owned()
}

/// Unwrap and parse a JSONP body.
pub fn parse_jsonp(body: &str) -> Result<Value> {
    let (callback, payload) = extract_envelope(body)?;
    log::debug!("JSONP callback '{}', {} bytes", callback, payload.len());

    let cleaned = clean_payload(payload);
    serde_json::from_str(&cleaned).map_err(|e| {
        AppError::parse_with_excerpt("jsonp", format!("payload is not JSON: {e}"), &cleaned)
    })
}

/// Adapter for the JSONP stock-search API.
pub struct StockQueryAdapter {
    backend: StockQueryBackend,
    client: Client,
}

impl StockQueryAdapter {
    pub fn new(backend: StockQueryBackend, client: Client) -> Self {
        Self { backend, client }
    }
}

#[async_trait]
impl BackendAdapter for StockQueryAdapter {
    fn name(&self) -> &str {
        &self.backend.name
    }

    fn kind(&self) -> &'static str {
        "stock_query"
    }

    async fn fetch(&self) -> Result<Vec<RoomRecord>> {
        let first = self
            .backend
            .target_dates
            .first()
            .copied()
            .ok_or_else(|| AppError::config(format!("{}: no target dates", self.backend.name)))?;

        let (start, end) = week_range(first);
        let params = query_params(&self.backend, start, end, Utc::now().timestamp_millis());
        let body = fetch_text_with_query(&self.client, &self.backend.api_url, &params).await?;
        log::debug!("{}: response {}", self.backend.name, crate::error::excerpt(&body));

        let doc = parse_jsonp(&body)?;
        let targets: BTreeSet<_> = self.backend.target_dates.iter().copied().collect();
        parse_stock_document(&doc, &self.backend, &targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_named_envelopes() {
        let (name, payload) = extract_envelope("jsonp1700000000000({\"a\":1})").unwrap();
        assert_eq!(name, "jsonp1700000000000");
        assert_eq!(payload, "{\"a\":1}");

        let (name, payload) = extract_envelope("  getStockData({\"a\":1});\n").unwrap();
        assert_eq!(name, "getStockData");
        assert_eq!(payload, "{\"a\":1}");

        let (name, _) = extract_envelope("/**/ cb_x.y({});").unwrap();
        assert_eq!(name, "cb_x.y");
    }

    #[test]
    fn test_guarded_envelopes() {
        let body = "/**/ typeof cb === 'function' && cb({\"a\":[1]});";
        let (name, payload) = extract_envelope(body).unwrap();
        assert_eq!(name, "cb");
        assert_eq!(payload, "{\"a\":[1]}");

        let body = "try{getStockData({\"a\":1})}catch(e){}";
        let (name, payload) = extract_envelope(body).unwrap();
        assert_eq!(name, "getStockData");
        assert_eq!(payload, "{\"a\":1}");

        let (_, payload) = extract_envelope("cb([{\"a\":1}]);").unwrap();
        assert_eq!(payload, "[{\"a\":1}]");
    }

    #[test]
    fn test_missing_envelope_is_error() {
        let err = extract_envelope("<html>maintenance</html>").unwrap_err();
        assert!(err.to_string().contains("maintenance"));
    }

    #[test]
    fn test_dirty_payload_parses_like_clean_json() {
        let dirty = "getStockData({'rooms': [{'room_name_eng': 'Twin &amp; Bath',\u{1}\n\
                     'aki': [{'aki_date': '2025/10/24', 'aki_num': '2'}]}]});";
        let clean = r#"{"rooms": [{"room_name_eng": "Twin & Bath", "aki": [{"aki_date": "2025/10/24", "aki_num": "2"}]}]}"#;

        let parsed = parse_jsonp(dirty).unwrap();
        let expected: Value = serde_json::from_str(clean).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_each_cleanup_step_is_needed() {
        // Control character alone breaks strict JSON.
        assert!(serde_json::from_str::<Value>("{\"a\":\u{1}1}").is_err());
        assert_eq!(clean_payload("{\"a\":\u{1}1}"), "{\"a\":1}");
        // Single quotes.
        assert_eq!(clean_payload("{'a':'b'}"), "{\"a\":\"b\"}");
        // Entities.
        assert_eq!(clean_payload("{\"a\":\"&lt;b&gt;\"}"), "{\"a\":\"<b>\"}");
    }

    #[test]
    fn test_malformed_json_after_cleanup() {
        let err = parse_jsonp("cb({rooms: [})").unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }
}
