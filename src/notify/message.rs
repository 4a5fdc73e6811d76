// src/notify/message.rs

//! Human-readable change summaries.

use chrono::{DateTime, Local, NaiveDate};

use crate::models::AvailabilityTuple;
use crate::pipeline::DiffResult;

/// Static context printed around a diff.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    pub target_dates: Vec<NaiveDate>,
    /// `(backend name, booking url)`
    pub booking_urls: Vec<(String, String)>,
}

/// Render the notification body for a diff.
pub fn format_message(
    diff: &DiffResult,
    context: &MessageContext,
    checked_at: DateTime<Local>,
) -> String {
    let dates: Vec<String> = context
        .target_dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();

    let mut lines = vec!["Hotel Availability Update".to_string(), String::new()];
    lines.push(format!("Check time: {}", checked_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(format!("Target dates: {}", dates.join(", ")));
    lines.push(String::new());

    if !diff.new_available.is_empty() {
        lines.push("NEW ROOMS AVAILABLE:".into());
        lines.extend(diff.new_available.iter().map(detailed_line));
        lines.push(String::new());
    }

    if !diff.lost_available.is_empty() {
        lines.push("ROOMS NO LONGER AVAILABLE:".into());
        lines.extend(
            diff.lost_available
                .iter()
                .map(|t| format!("• {} on {}", t.room, t.date)),
        );
        lines.push(String::new());
    }

    if diff.current_available.is_empty() {
        lines.push("No rooms currently available".into());
    } else {
        lines.push("CURRENTLY AVAILABLE:".into());
        lines.extend(diff.current_available.iter().map(detailed_line));
    }

    if !context.booking_urls.is_empty() {
        lines.push(String::new());
        for (name, url) in &context.booking_urls {
            lines.push(format!("Book now ({name}): {url}"));
        }
    }

    lines.join("\n")
}

fn detailed_line(t: &AvailabilityTuple) -> String {
    let marker = if t.best_effort { " (best-effort)" } else { "" };
    format!(
        "• {} on {}: {} rooms at {}{}",
        t.room, t.date, t.count, t.price, marker
    )
}

/// Subject line for a diff, or `None` when nothing changed.
pub fn subject(diff: &DiffResult) -> Option<String> {
    if !diff.new_available.is_empty() {
        Some(format!("ROOMS AVAILABLE! {} new options", diff.new_available.len()))
    } else if !diff.lost_available.is_empty() {
        Some(format!(
            "Rooms no longer available: {} options",
            diff.lost_available.len()
        ))
    } else {
        None
    }
}
