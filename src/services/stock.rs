// src/services/stock.rs

//! Stock-search API request building and document analysis.
//!
//! Shared by the JSONP and the paginated JSON adapters. The document looks
//! like:
//!
//! ```text
//! { "rooms": [ { "room_id", "room_name_eng", "room_name",
//!                "aki":   [ { "aki_date": "2025/10/24", "aki_num": "2" } ],
//!                "plans": [ { "prices": [ { "price_date", "price_2" } ] } ] } ] }
//! ```
//!
//! Numbers arrive as strings or as numbers depending on the deployment.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    NO_PRICE, RoomRecord, RoomStatus, StockQueryBackend, canonical_date, qualify_room,
};

/// Monday and Sunday of the week containing `date`.
pub fn week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

/// Query parameters for one week of stock data.
///
/// `stamp` is a millisecond timestamp; it doubles as the cache buster and
/// the callback name suffix.
pub fn query_params(
    backend: &StockQueryBackend,
    start: NaiveDate,
    end: NaiveDate,
    stamp: i64,
) -> Vec<(String, String)> {
    let start = start.format("%Y/%m/%d").to_string();
    let end = end.format("%Y/%m/%d").to_string();
    let input_data = format!(
        "id=stock_calendar_1,start_date={start},end_date={end},select_room=,select_plan={plan},\
         user_num={guests},init_flag=0,disp_cal_room=1,disp_cal_plan=,disp_cal_plan_btn=1,\
         init_plan_num=0,kid=",
        plan = backend.plan_id,
        guests = backend.guests,
    );

    vec![
        ("id".into(), backend.hotel_id.clone()),
        ("planId".into(), backend.plan_id.clone()),
        ("startDate".into(), start),
        ("endDate".into(), end),
        ("input_data".into(), input_data),
        ("ty".into(), "ser".into()),
        ("mo".into(), "0".into()),
        ("meo".into(), "0".into()),
        ("yr".into(), "YES".into()),
        ("lan".into(), backend.lang.clone()),
        ("pt".into(), "-1".into()),
        ("mel".into(), "-1".into()),
        ("pay".into(), "0".into()),
        ("callback".into(), format!("jsonp{stamp}")),
        ("_".into(), stamp.to_string()),
    ]
}

/// Convert a stock document into records for the target dates.
pub fn parse_stock_document(
    doc: &Value,
    backend: &StockQueryBackend,
    targets: &BTreeSet<NaiveDate>,
) -> Result<Vec<RoomRecord>> {
    let rooms = doc.get("rooms").and_then(Value::as_array).ok_or_else(|| {
        AppError::parse_with_excerpt(
            backend.name.as_str(),
            "stock document has no rooms array",
            &doc.to_string(),
        )
    })?;

    let targets: BTreeSet<String> = targets
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let price_key = backend.price_key();
    let mut records = Vec::new();

    for room in rooms {
        let room_name = qualify_room(&backend.name, &room_display_name(room));

        for aki in array(room, "aki") {
            let Some(date) = aki
                .get("aki_date")
                .map(lossy_string)
                .and_then(|d| canonical_date(&d))
            else {
                continue;
            };
            if !targets.contains(&date) {
                continue;
            }

            let available = aki.get("aki_num").map(as_u32).unwrap_or(0);
            let price = find_price(room, &date, &price_key);
            let fallback = if price != NO_PRICE {
                RoomStatus::SoldOut
            } else {
                RoomStatus::NotBookable
            };

            records.push(RoomRecord::with_count(
                room_name.as_str(),
                date,
                available,
                price,
                fallback,
            ));
        }
    }

    Ok(records)
}

/// Scan every plan's price entries for `date`.
///
/// When several plans price the same date, the last non-zero entry wins.
fn find_price(room: &Value, date: &str, price_key: &str) -> String {
    let mut price = NO_PRICE.to_string();

    for plan in array(room, "plans") {
        for entry in array(plan, "prices") {
            let entry_date = entry
                .get("price_date")
                .map(lossy_string)
                .and_then(|d| canonical_date(&d));
            if entry_date.as_deref() != Some(date) {
                continue;
            }

            let amount = entry.get(price_key).map(lossy_string).unwrap_or_default();
            let amount = amount.trim();
            if !amount.is_empty() && amount != "0" {
                price = format!("¥{amount}");
            }
        }
    }

    price
}

fn room_display_name(room: &Value) -> String {
    ["room_name_eng", "room_name"]
        .iter()
        .filter_map(|key| room.get(*key).map(lossy_string))
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| {
            let id = room.get("room_id").map(lossy_string).unwrap_or_default();
            format!("Room {id}")
        })
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Render a JSON scalar as text; strings are taken verbatim.
fn lossy_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Room count from a number or numeric string. Whole floats such as `2.0`
/// count; fractional or negative values read as zero.
fn as_u32(value: &Value) -> u32 {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
            None => n.as_f64().map(whole_count).unwrap_or(0),
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(whole_count))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn whole_count(n: f64) -> u32 {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 {
        n.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
