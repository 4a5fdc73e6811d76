// src/models/backend.rs

//! Per-backend configuration, tagged by adapter variant.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One reservation backend. The `kind` tag selects the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Plain JSON stock API, fetched one calendar week per page
    PaginatedJson(StockQueryBackend),

    /// JSONP stock API, week of the first target date
    StockQuery(StockQueryBackend),

    /// Month-indexed JSON holding pre-rendered calendar cells
    CalendarWidget(CalendarWidgetBackend),

    /// Server-rendered HTML reached through forms and period links
    LegacyHtml(LegacyHtmlBackend),
}

impl BackendConfig {
    /// Display name, also used to qualify room names.
    pub fn name(&self) -> &str {
        match self {
            Self::PaginatedJson(b) | Self::StockQuery(b) => &b.name,
            Self::CalendarWidget(b) => &b.name,
            Self::LegacyHtml(b) => &b.name,
        }
    }

    /// Adapter variant tag as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PaginatedJson(_) => "paginated_json",
            Self::StockQuery(_) => "stock_query",
            Self::CalendarWidget(_) => "calendar_widget",
            Self::LegacyHtml(_) => "legacy_html",
        }
    }

    /// Endpoint the adapter starts from.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::PaginatedJson(b) | Self::StockQuery(b) => &b.api_url,
            Self::CalendarWidget(b) => &b.url,
            Self::LegacyHtml(b) => &b.url,
        }
    }

    pub fn target_dates(&self) -> &[NaiveDate] {
        match self {
            Self::PaginatedJson(b) | Self::StockQuery(b) => &b.target_dates,
            Self::CalendarWidget(b) => &b.target_dates,
            Self::LegacyHtml(b) => &b.target_dates,
        }
    }

    /// Human-facing page for booking, if configured.
    pub fn booking_url(&self) -> Option<&str> {
        match self {
            Self::PaginatedJson(b) | Self::StockQuery(b) => b.booking_url.as_deref(),
            Self::CalendarWidget(b) => b.booking_url.as_deref(),
            Self::LegacyHtml(b) => b.booking_url.as_deref(),
        }
    }
}

/// Stock-search API settings shared by the JSON and JSONP variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQueryBackend {
    pub name: String,

    /// Stock search endpoint
    pub api_url: String,

    /// Hotel identifier (`id`)
    pub hotel_id: String,

    /// Plan selector (`planId`)
    #[serde(default)]
    pub plan_id: String,

    /// Guest count sent as `user_num`
    #[serde(default = "defaults::guests")]
    pub guests: u32,

    /// Site language (`lan`)
    #[serde(default = "defaults::lang")]
    pub lang: String,

    /// Price entry key; defaults to `price_<guests>`
    #[serde(default)]
    pub price_field: Option<String>,

    pub target_dates: Vec<NaiveDate>,

    #[serde(default)]
    pub booking_url: Option<String>,
}

impl StockQueryBackend {
    pub fn price_key(&self) -> String {
        self.price_field
            .clone()
            .unwrap_or_else(|| format!("price_{}", self.guests))
    }
}

/// Calendar widget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarWidgetBackend {
    pub name: String,

    /// Month document endpoint
    pub url: String,

    /// Room or plan label the calendar describes
    pub room_name: String,

    pub year: i32,
    pub month: u32,

    /// Query parameter carrying the year
    #[serde(default = "defaults::year_param")]
    pub year_param: String,

    /// Query parameter carrying the month
    #[serde(default = "defaults::month_param")]
    pub month_param: String,

    /// Additional fixed query parameters
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Dates to keep; empty keeps the whole month
    #[serde(default)]
    pub target_dates: Vec<NaiveDate>,

    #[serde(default)]
    pub booking_url: Option<String>,
}

impl CalendarWidgetBackend {
    /// Whether `date` is one the caller asked for.
    pub fn wants(&self, date: NaiveDate) -> bool {
        if self.target_dates.is_empty() {
            date.year() == self.year && date.month() == self.month
        } else {
            self.target_dates.contains(&date)
        }
    }
}

/// Legacy HTML reservation pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyHtmlBackend {
    pub name: String,

    /// Landing page
    pub url: String,

    pub target_dates: Vec<NaiveDate>,

    #[serde(default)]
    pub booking_url: Option<String>,

    /// Maximum "next period" steps before giving up
    #[serde(default = "defaults::max_nav_steps")]
    pub max_nav_steps: usize,

    /// Pause between navigation steps in milliseconds
    #[serde(default = "defaults::nav_delay")]
    pub nav_delay_ms: u64,

    #[serde(default)]
    pub markup: LegacyMarkup,
}

/// Captions, glyphs and keywords the legacy pages are scanned for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyMarkup {
    #[serde(default = "defaults::search_caption")]
    pub search_caption: String,

    #[serde(default = "defaults::next_caption")]
    pub next_caption: String,

    #[serde(default = "defaults::available_glyph")]
    pub available_glyph: String,

    #[serde(default = "defaults::full_glyph")]
    pub full_glyph: String,

    #[serde(default = "defaults::dash_glyphs")]
    pub dash_glyphs: Vec<String>,

    #[serde(default = "defaults::currency_glyph")]
    pub currency_glyph: String,

    /// A first cell containing one of these denotes a room row
    #[serde(default = "defaults::room_tokens")]
    pub room_tokens: Vec<String>,

    /// Link text/href keywords that suggest a calendar page
    #[serde(default = "defaults::calendar_keywords")]
    pub calendar_keywords: Vec<String>,

    /// Page text that suggests a calendar is shown
    #[serde(default = "defaults::calendar_indicators")]
    pub calendar_indicators: Vec<String>,

    /// Calendar script file referenced from page scripts
    #[serde(default = "defaults::calendar_script")]
    pub calendar_script: String,

    /// `lan` parameter for the calendar script
    #[serde(default = "defaults::lang")]
    pub calendar_lang: String,
}

impl Default for LegacyMarkup {
    fn default() -> Self {
        Self {
            search_caption: defaults::search_caption(),
            next_caption: defaults::next_caption(),
            available_glyph: defaults::available_glyph(),
            full_glyph: defaults::full_glyph(),
            dash_glyphs: defaults::dash_glyphs(),
            currency_glyph: defaults::currency_glyph(),
            room_tokens: defaults::room_tokens(),
            calendar_keywords: defaults::calendar_keywords(),
            calendar_indicators: defaults::calendar_indicators(),
            calendar_script: defaults::calendar_script(),
            calendar_lang: defaults::lang(),
        }
    }
}

mod defaults {
    pub fn guests() -> u32 {
        2
    }
    pub fn lang() -> String {
        "JPN".into()
    }
    pub fn year_param() -> String {
        "year".into()
    }
    pub fn month_param() -> String {
        "month".into()
    }
    pub fn max_nav_steps() -> usize {
        15
    }
    pub fn nav_delay() -> u64 {
        1000
    }

    // Legacy markup
    pub fn search_caption() -> String {
        "この条件で空室状況を表示".into()
    }
    pub fn next_caption() -> String {
        "後の期間".into()
    }
    pub fn available_glyph() -> String {
        "○".into()
    }
    pub fn full_glyph() -> String {
        "×".into()
    }
    pub fn dash_glyphs() -> Vec<String> {
        vec!["-".into(), "－".into(), "―".into()]
    }
    pub fn currency_glyph() -> String {
        "円".into()
    }
    pub fn room_tokens() -> Vec<String> {
        vec!["室".into(), "ルーム".into()]
    }
    pub fn calendar_keywords() -> Vec<String> {
        vec![
            "空室".into(),
            "予約".into(),
            "カレンダー".into(),
            "宿泊".into(),
            "reservation".into(),
            "calendar".into(),
            "availability".into(),
        ]
    }
    pub fn calendar_indicators() -> Vec<String> {
        vec![
            "カレンダー".into(),
            "空室".into(),
            "○".into(),
            "×".into(),
            "後の期間".into(),
        ]
    }
    pub fn calendar_script() -> String {
        "calendar.asp".into()
    }
}
