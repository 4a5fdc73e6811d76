// src/models/record.rs

//! Normalized room availability records.
//!
//! Every backend adapter, whatever its wire format, produces [`RoomRecord`]s.
//! Only records with [`RoomStatus::Available`] survive into the persisted
//! snapshot, reduced to [`AvailabilityTuple`]s.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Price placeholder when a backend exposes no price for the date.
pub const NO_PRICE: &str = "No price";

/// Price placeholder when the price is only visible on the booking site.
pub const CHECK_WEBSITE: &str = "Check website";

/// Bookability of one room on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    SoldOut,
    NotBookable,
    /// Day not yet opened for booking. Informational only.
    NotReleased,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::SoldOut => "sold_out",
            RoomStatus::NotBookable => "not_bookable",
            RoomStatus::NotReleased => "not_released",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a record was extracted, from most to least reliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMethod {
    /// Structured data (JSON document, or a classed markup fragment)
    #[default]
    Structured,
    /// A well-formed availability table
    Table,
    /// Line-based scan of page text
    FreeText,
}

impl ParseMethod {
    /// Whether the record came from the best-effort tier.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, ParseMethod::FreeText)
    }
}

/// One room/date availability observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Backend-qualified room name
    pub room_name: String,

    /// Canonical `YYYY-MM-DD`
    pub date: String,

    /// Rooms left; `1` when available but the exact count is unknown
    pub available_count: u32,

    /// Display price or a placeholder
    pub price: String,

    pub status: RoomStatus,

    #[serde(default)]
    pub method: ParseMethod,
}

impl RoomRecord {
    /// Build a record from a known count.
    ///
    /// A positive count always means `Available`; otherwise `unavailable`
    /// is used (and coerced to `NotBookable` if it was `Available`).
    pub fn with_count(
        room_name: impl Into<String>,
        date: impl Into<String>,
        available_count: u32,
        price: impl Into<String>,
        unavailable: RoomStatus,
    ) -> Self {
        let status = if available_count > 0 {
            RoomStatus::Available
        } else if unavailable == RoomStatus::Available {
            RoomStatus::NotBookable
        } else {
            unavailable
        };

        Self {
            room_name: room_name.into(),
            date: date.into(),
            available_count,
            price: price.into(),
            status,
            method: ParseMethod::Structured,
        }
    }

    /// Build a record from a status alone. Available rooms report a count of `1`.
    pub fn with_status(
        room_name: impl Into<String>,
        date: impl Into<String>,
        status: RoomStatus,
        price: impl Into<String>,
    ) -> Self {
        let available_count = u32::from(status == RoomStatus::Available);
        Self {
            room_name: room_name.into(),
            date: date.into(),
            available_count,
            price: price.into(),
            status,
            method: ParseMethod::Structured,
        }
    }

    /// Tag the record with the extraction method.
    pub fn via(mut self, method: ParseMethod) -> Self {
        self.method = method;
        self
    }

    /// Whether status and count agree.
    pub fn is_consistent(&self) -> bool {
        (self.status == RoomStatus::Available) == (self.available_count > 0)
    }

    /// Reduce to the persisted snapshot shape, if available.
    pub fn to_tuple(&self) -> Option<AvailabilityTuple> {
        (self.status == RoomStatus::Available).then(|| AvailabilityTuple {
            room: self.room_name.clone(),
            date: self.date.clone(),
            count: self.available_count,
            price: self.price.clone(),
            best_effort: self.method.is_best_effort(),
        })
    }
}

/// Persisted availability entry. Identity is `(room, date)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityTuple {
    pub room: String,
    pub date: String,
    pub count: u32,
    pub price: String,

    /// Only meaningful within the cycle that produced it
    #[serde(skip)]
    pub best_effort: bool,
}

impl AvailabilityTuple {
    pub fn new(
        room: impl Into<String>,
        date: impl Into<String>,
        count: u32,
        price: impl Into<String>,
    ) -> Self {
        Self {
            room: room.into(),
            date: date.into(),
            count,
            price: price.into(),
            best_effort: false,
        }
    }

    /// The identity key.
    pub fn key(&self) -> (&str, &str) {
        (&self.room, &self.date)
    }
}

impl PartialEq for AvailabilityTuple {
    fn eq(&self, other: &Self) -> bool {
        self.room == other.room
            && self.date == other.date
            && self.count == other.count
            && self.price == other.price
    }
}

impl Eq for AvailabilityTuple {}

/// Qualify a room name with its backend so names never collide.
pub fn qualify_room(source: &str, room: &str) -> String {
    format!("{} - {}", source, room.trim())
}

/// Canonicalise a `YYYY/M/D` or `YYYY-MM-DD` date string.
pub fn canonical_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Parse a date written with `/` or `-` delimiters.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
}

/// Collapse duplicate `(room, date)` records; the last one wins but keeps
/// the position of the first occurrence.
pub fn normalize_records(records: Vec<RoomRecord>) -> Vec<RoomRecord> {
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut result: Vec<RoomRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = (record.room_name.clone(), record.date.clone());
        match positions.get(&key) {
            Some(&idx) => result[idx] = record,
            None => {
                positions.insert(key, result.len());
                result.push(record);
            }
        }
    }

    result
}

/// Reduce records to the available set, dropping everything else
/// (including `NotReleased`).
pub fn available_tuples(records: &[RoomRecord]) -> Vec<AvailabilityTuple> {
    records.iter().filter_map(RoomRecord::to_tuple).collect()
}
