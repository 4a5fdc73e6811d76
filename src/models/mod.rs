// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod backend;
mod config;
mod notify;
mod record;

// Re-export all public types
pub use backend::{
    BackendConfig, CalendarWidgetBackend, LegacyHtmlBackend, LegacyMarkup, StockQueryBackend,
};
pub use config::{Config, HttpConfig, MonitorConfig};
pub use notify::{EmailConfig, NotifyConfig, PushoverConfig, TelegramConfig, WebhookConfig};
pub use record::{
    AvailabilityTuple, CHECK_WEBSITE, NO_PRICE, ParseMethod, RoomRecord, RoomStatus,
    available_tuples, canonical_date, normalize_records, parse_date, qualify_room,
};
