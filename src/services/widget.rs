// src/services/widget.rs

//! Calendar widget adapter.
//!
//! The widget endpoint returns a month-indexed JSON document. Each month
//! entry carries a `caption` (e.g. `2025年10月`) and nested per-week objects
//! whose string values are pre-rendered day cells:
//!
//! ```text
//! <td class="cal-day 2025-10-24"><i class="fa fa-circle"></i></td>
//! ```
//!
//! The date comes from a `YYYY-MM-DD` class token, the status from icon
//! classes.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    CHECK_WEBSITE, CalendarWidgetBackend, RoomRecord, RoomStatus, parse_date, qualify_room,
};
use crate::services::BackendAdapter;
use crate::utils::http::fetch_text_with_query;

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date token regex"));

static CAPTION_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*[年/\-.]\s*(\d{1,2})").expect("valid caption regex")
});

const ICON_PREFIXES: [&str; 4] = ["fa-", "icon-", "ico-", "glyphicon-"];

/// Status marker found in a day cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Circle,
    Triangle,
    X,
    Minus,
}

impl Icon {
    /// Classify one class token, ignoring icon-font prefixes.
    pub fn from_class(token: &str) -> Option<Self> {
        let name = ICON_PREFIXES
            .iter()
            .find_map(|prefix| token.strip_prefix(prefix))
            .unwrap_or(token);

        match name {
            "circle" | "dot-circle" | "circle-fill" => Some(Icon::Circle),
            "exclamation-triangle" | "triangle" | "warning" | "triangle-exclamation" => {
                Some(Icon::Triangle)
            }
            "times" | "close" | "xmark" | "x" | "remove" | "times-circle" => Some(Icon::X),
            "minus" | "dash" | "minus-circle" => Some(Icon::Minus),
            _ => None,
        }
    }
}

/// Pick the cell status from every icon present.
///
/// Circle and triangle win over X, which wins over minus.
pub fn classify_icons(icons: &[Icon]) -> Option<RoomStatus> {
    let has = |icon: Icon| icons.contains(&icon);

    if has(Icon::Circle) || has(Icon::Triangle) {
        Some(RoomStatus::Available)
    } else if has(Icon::X) {
        Some(RoomStatus::SoldOut)
    } else if has(Icon::Minus) {
        Some(RoomStatus::NotReleased)
    } else {
        None
    }
}

/// One decoded day cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: String,
    pub status: RoomStatus,
}

/// Decode a day fragment. Cells without a date token or icon yield `None`.
pub fn parse_day_cell(fragment: &str) -> Option<DayCell> {
    // Day cells are usually bare <td>s, which only survive inside a table.
    let doc = Html::parse_fragment(&format!("<table><tr>{fragment}</tr></table>"));
    let selector = Selector::parse("[class]").ok()?;

    let mut date = None;
    let mut icons = Vec::new();

    for element in doc.select(&selector) {
        for token in element.value().classes() {
            if date.is_none() && DATE_TOKEN.is_match(token) {
                date = parse_date(token).map(|d| d.format("%Y-%m-%d").to_string());
            }
            if let Some(icon) = Icon::from_class(token) {
                icons.push(icon);
            }
        }
    }

    Some(DayCell {
        date: date?,
        status: classify_icons(&icons)?,
    })
}

/// Whether a caption names `year`/`month`.
pub fn caption_matches(caption: &str, year: i32, month: u32) -> bool {
    CAPTION_MONTH.captures_iter(caption).any(|caps| {
        let y = caps.get(1).and_then(|m| m.as_str().parse::<i32>().ok());
        let m = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        y == Some(year) && m == Some(month)
    })
}

/// Locate the month sub-document whose caption names `year`/`month`.
pub fn find_month(doc: &Value, year: i32, month: u32) -> Option<&Value> {
    let has_caption = |v: &Value| {
        v.get("caption")
            .and_then(Value::as_str)
            .is_some_and(|c| caption_matches(c, year, month))
    };

    if has_caption(doc) {
        return Some(doc);
    }

    match doc {
        Value::Object(map) => map.values().find(|v| has_caption(v)),
        Value::Array(items) => items.iter().find(|v| has_caption(v)),
        _ => None,
    }
}

/// Collect every day fragment below a month entry, skipping its caption.
fn collect_fragments<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_fragments(v, out)),
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| key.as_str() != "caption")
            .for_each(|(_, v)| collect_fragments(v, out)),
        _ => {}
    }
}

/// Parse every day cell of the configured month, including days not yet
/// released.
pub fn parse_month(doc: &Value, backend: &CalendarWidgetBackend) -> Result<Vec<RoomRecord>> {
    let month = find_month(doc, backend.year, backend.month).ok_or_else(|| {
        AppError::parse_with_excerpt(
            backend.name.as_str(),
            format!("no calendar caption for {}-{:02}", backend.year, backend.month),
            &doc.to_string(),
        )
    })?;

    let mut fragments = Vec::new();
    collect_fragments(month, &mut fragments);

    let room = qualify_room(&backend.name, &backend.room_name);
    let records = fragments
        .into_iter()
        .filter_map(parse_day_cell)
        .filter(|cell| parse_date(&cell.date).is_some_and(|d| backend.wants(d)))
        .map(|cell| RoomRecord::with_status(room.as_str(), cell.date, cell.status, CHECK_WEBSITE))
        .collect();

    Ok(records)
}

/// Adapter for month-indexed calendar widgets.
pub struct CalendarWidgetAdapter {
    backend: CalendarWidgetBackend,
    client: Client,
}

impl CalendarWidgetAdapter {
    pub fn new(backend: CalendarWidgetBackend, client: Client) -> Self {
        Self { backend, client }
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            (self.backend.year_param.clone(), self.backend.year.to_string()),
            (self.backend.month_param.clone(), self.backend.month.to_string()),
        ];
        query.extend(
            self.backend
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        query
    }
}

#[async_trait]
impl BackendAdapter for CalendarWidgetAdapter {
    fn name(&self) -> &str {
        &self.backend.name
    }

    fn kind(&self) -> &'static str {
        "calendar_widget"
    }

    async fn fetch(&self) -> Result<Vec<RoomRecord>> {
        let body = fetch_text_with_query(&self.client, &self.backend.url, &self.query()).await?;
        let doc: Value = serde_json::from_str(&body).map_err(|e| {
            AppError::parse_with_excerpt(
                self.backend.name.as_str(),
                format!("widget document is not JSON: {e}"),
                &body,
            )
        })?;

        let (released, unreleased): (Vec<_>, Vec<_>) = parse_month(&doc, &self.backend)?
            .into_iter()
            .partition(|r| r.status != RoomStatus::NotReleased);

        if !unreleased.is_empty() {
            log::debug!("{}: {} days not yet released", self.backend.name, unreleased.len());
        }
        Ok(released)
    }
}
