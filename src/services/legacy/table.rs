// src/services/legacy/table.rs

//! Availability extraction from legacy calendar pages.
//!
//! Two tiers:
//!
//! 1. **Table** ([`ParseMethod::Table`]): the first row holding at least two
//!    `M/D` cells is the header; later rows of the same table whose first
//!    cell names a room are read at the target columns.
//! 2. **Free text** ([`ParseMethod::FreeText`]): used only when no header row
//!    exists. Lines naming a room and a target date are classified from the
//!    glyphs in a small window around them. Results are best-effort.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::{LegacyMarkup, NO_PRICE, ParseMethod, RoomRecord, RoomStatus, qualify_room};
use crate::services::legacy::page::{SHORT_DATE, TargetDate, contains_token};
use crate::utils::normalize_whitespace;

/// Lines either side of a free-text match inspected for glyphs.
const CONTEXT_LINES: usize = 2;

/// Extract records from a page, preferring the table tier.
pub fn parse_availability(
    html: &str,
    text: &str,
    targets: &[TargetDate],
    source: &str,
    markup: &LegacyMarkup,
) -> Vec<RoomRecord> {
    match parse_table(html, targets, source, markup) {
        Some(records) => records,
        None => {
            log::info!("{}: no availability table, scanning page text", source);
            parse_free_text(text, targets, source, markup)
        }
    }
}

/// Table tier. `None` when the page has no date header row.
pub fn parse_table(
    html: &str,
    targets: &[TargetDate],
    source: &str,
    markup: &LegacyMarkup,
) -> Option<Vec<RoomRecord>> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse("table").ok()?;
    let row_sel = Selector::parse("tr").ok()?;

    for table in doc.select(&table_sel) {
        let rows: Vec<ElementRef<'_>> = table
            .select(&row_sel)
            .filter(|row| owning_table(*row).map(|t| t.id()) == Some(table.id()))
            .collect();

        let Some(header_idx) = rows.iter().position(|row| is_header_row(*row)) else {
            continue;
        };

        let columns = target_columns(rows[header_idx], targets);
        log::debug!(
            "{}: header row {} maps {} target columns",
            source,
            header_idx,
            columns.len()
        );

        let price_re = price_regex(&markup.currency_glyph);
        let mut records = Vec::new();

        for row in &rows[header_idx + 1..] {
            let cells = cells(*row);
            let Some(room) = cells.first().map(|c| cell_text(*c)) else {
                continue;
            };
            if !markup.room_tokens.iter().any(|t| room.contains(t.as_str())) {
                continue;
            }
            let room_name = qualify_room(source, &room);

            for (col, target) in &columns {
                let Some(cell) = cells.get(*col) else {
                    continue;
                };
                let text = cell_text(*cell);
                let Some(status) = classify_cell(&text, markup) else {
                    log::debug!("{}: unrecognised cell '{}' for {}", source, text, target.token);
                    continue;
                };
                let price = price_re
                    .as_ref()
                    .and_then(|re| extract_price(re, &text))
                    .unwrap_or_else(|| NO_PRICE.to_string());

                records.push(
                    RoomRecord::with_status(room_name.as_str(), target.iso.as_str(), status, price)
                        .via(ParseMethod::Table),
                );
            }
        }

        return Some(records);
    }

    None
}

/// Free-text tier over newline-separated page text.
pub fn parse_free_text(
    text: &str,
    targets: &[TargetDate],
    source: &str,
    markup: &LegacyMarkup,
) -> Vec<RoomRecord> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !markup.room_tokens.iter().any(|t| line.contains(t.as_str())) {
            continue;
        }
        let present: Vec<&TargetDate> = targets
            .iter()
            .filter(|t| contains_token(line, &t.token))
            .collect();
        if present.is_empty() {
            continue;
        }

        let lo = i.saturating_sub(CONTEXT_LINES);
        let hi = (i + CONTEXT_LINES + 1).min(lines.len());
        let context = lines[lo..hi].join(" ");

        let status = if context.contains(markup.available_glyph.as_str()) {
            RoomStatus::Available
        } else if context.contains(markup.full_glyph.as_str()) {
            RoomStatus::SoldOut
        } else {
            continue;
        };

        let room_name = qualify_room(source, &normalize_whitespace(line));
        for target in present {
            records.push(
                RoomRecord::with_status(room_name.as_str(), target.iso.as_str(), status, NO_PRICE)
                    .via(ParseMethod::FreeText),
            );
        }
    }

    if !records.is_empty() {
        log::warn!("{}: {} best-effort records from page text", source, records.len());
    }
    records
}

/// Classify a cell by its glyph: available, full, then dash.
pub fn classify_cell(text: &str, markup: &LegacyMarkup) -> Option<RoomStatus> {
    if text.contains(markup.available_glyph.as_str()) {
        Some(RoomStatus::Available)
    } else if text.contains(markup.full_glyph.as_str()) {
        Some(RoomStatus::SoldOut)
    } else if markup.dash_glyphs.iter().any(|d| text.contains(d.as_str())) {
        Some(RoomStatus::NotBookable)
    } else {
        None
    }
}

fn price_regex(currency: &str) -> Option<Regex> {
    Regex::new(&format!(r"([\d,]+)\s*{}", regex::escape(currency))).ok()
}

fn extract_price(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("¥{}", m.as_str()))
}

/// Innermost table holding `row`; rows of nested tables belong to those.
fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    normalize_whitespace(&cell.text().collect::<String>())
}

fn cell_dates(cell: ElementRef<'_>) -> Vec<String> {
    let text = cell_text(cell);
    SHORT_DATE
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn is_header_row(row: ElementRef<'_>) -> bool {
    cells(row)
        .into_iter()
        .filter(|c| !cell_dates(*c).is_empty())
        .count()
        >= 2
}

/// Cell positions of the target dates within the header row.
fn target_columns<'t>(
    header: ElementRef<'_>,
    targets: &'t [TargetDate],
) -> Vec<(usize, &'t TargetDate)> {
    let cells = cells(header);
    targets
        .iter()
        .filter_map(|target| {
            cells
                .iter()
                .position(|c| cell_dates(*c).iter().any(|d| *d == target.token))
                .map(|col| (col, target))
        })
        .collect()
}
