// src/services/legacy/page.rs

//! Held pages and the text checks run against them.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::Html;

use crate::models::LegacyMarkup;
use crate::utils::http::Fetched;

/// `M/D` as printed on legacy calendars.
pub(crate) static SHORT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}").expect("valid short date regex"));

/// A fetched legacy page with its visible text extracted once.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub html: String,
    pub text: String,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let text = visible_text(&html);
        Self {
            url: url.into(),
            html,
            text,
        }
    }

    /// Whether every target token occurs in the page text.
    pub fn shows_all(&self, targets: &[TargetDate]) -> bool {
        !targets.is_empty() && targets.iter().all(|t| contains_token(&self.text, &t.token))
    }

    /// Whether any target token occurs in the page text.
    pub fn shows_any_token(&self, targets: &[TargetDate]) -> bool {
        targets.iter().any(|t| contains_token(&self.text, &t.token))
    }

    /// Whether the page looks like it shows the target month: any target
    /// token, or the month label of the first target.
    pub fn shows_month(&self, targets: &[TargetDate]) -> bool {
        if self.shows_any_token(targets) {
            return true;
        }
        targets
            .first()
            .is_some_and(|t| contains_month_label(&self.text, t.date.month()))
    }

    /// Whether the page carries any calendar indicator.
    pub fn has_calendar_indicators(&self, markup: &LegacyMarkup) -> bool {
        markup
            .calendar_indicators
            .iter()
            .chain(std::iter::once(&markup.next_caption))
            .any(|indicator| self.text.contains(indicator.as_str()))
    }

    /// Short dates visible on the page, for diagnostics.
    pub fn visible_dates(&self) -> Vec<&str> {
        SHORT_DATE
            .find_iter(&self.text)
            .map(|m| m.as_str())
            .take(5)
            .collect()
    }
}

impl From<Fetched> for Page {
    fn from(fetched: Fetched) -> Self {
        Page::new(fetched.url, fetched.body)
    }
}

/// A target date and the `M/D` token the legacy pages print for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDate {
    pub date: NaiveDate,
    pub token: String,
    pub iso: String,
}

impl TargetDate {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            token: format!("{}/{}", date.month(), date.day()),
            iso: date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn all(dates: &[NaiveDate]) -> Vec<Self> {
        dates.iter().copied().map(Self::new).collect()
    }
}

/// Elements whose text never renders as page content.
const HIDDEN: &[&str] = &["script", "style", "select", "option", "noscript", "template"];

/// Text nodes of the document, trimmed, one per line. Dropdown entries and
/// script bodies are left out.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    doc.root_element()
        .descendants()
        .filter(|node| {
            !node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| HIDDEN.contains(&e.name()))
            })
        })
        .filter_map(|node| node.value().as_text().map(|t| t.trim()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether `token` (`M/D`) occurs without being part of a longer date
/// such as `10/245` or `110/24`.
pub fn contains_token(text: &str, token: &str) -> bool {
    SHORT_DATE.find_iter(text).any(|m| {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        m.as_str() == token
            && !before.is_some_and(|c| c.is_ascii_digit() || c == '/')
            && !after.is_some_and(|c| c.is_ascii_digit() || c == '/')
    })
}

/// Whether the text carries the `M月` label for `month`.
pub fn contains_month_label(text: &str, month: u32) -> bool {
    let label = format!("{month}月");
    text.match_indices(&label).any(|(idx, _)| {
        !text[..idx]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit())
    })
}
