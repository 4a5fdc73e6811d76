// src/services/legacy/form.rs

//! Form extraction and link discovery on legacy pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::LegacyMarkup;
use crate::utils::{normalize_whitespace, resolve_url};

static STOCK_CALENDAR_INIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"initStockCalendarRe\(\s*["']([^"']+)["']"#).expect("valid init regex")
});

/// HTTP method declared by a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

impl FormMethod {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
            _ => FormMethod::Get,
        }
    }
}

/// A ready-to-send form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub action: String,
    pub method: FormMethod,
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite the year/month/day fields with `date`.
    ///
    /// A field counts as a date field if its name says so, or if its value
    /// looks like a default year, a month right after a year, or a day
    /// right after a month.
    pub fn apply_date(&mut self, date: NaiveDate) {
        let mut previous = DateField::None;

        for (name, value) in &mut self.fields {
            let kind = DateField::classify(name, value, previous);
            match kind {
                DateField::Year => *value = date.year().to_string(),
                DateField::Month => *value = date.month().to_string(),
                DateField::Day => *value = date.day().to_string(),
                DateField::None => {}
            }
            previous = kind;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Year,
    Month,
    Day,
    None,
}

impl DateField {
    fn classify(name: &str, value: &str, previous: DateField) -> Self {
        let name = name.to_ascii_lowercase();
        let number = value.trim().parse::<u32>().ok();

        if name.contains("year") || number.is_some_and(|n| (2000..=2100).contains(&n)) {
            DateField::Year
        } else if name.contains("month")
            || (previous == DateField::Year && number.is_some_and(|n| (1..=12).contains(&n)))
        {
            DateField::Month
        } else if name.contains("day")
            || (previous == DateField::Month && number.is_some_and(|n| (1..=31).contains(&n)))
        {
            DateField::Day
        } else {
            DateField::None
        }
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Build the submission for `form`, activating `control` if given.
pub fn form_submission(
    form: ElementRef<'_>,
    control: Option<ElementRef<'_>>,
    base: &Url,
) -> Option<FormSubmission> {
    let fields_sel = selector("input, select, textarea, button")?;
    let option_sel = selector("option")?;
    let control_id = control.map(|c| c.id());

    let mut fields = Vec::new();
    for field in form.select(&fields_sel) {
        let el = field.value();
        let Some(name) = el.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };

        let value = match el.name() {
            "select" => {
                let options: Vec<_> = field.select(&option_sel).collect();
                options
                    .iter()
                    .find(|o| o.value().attr("selected").is_some())
                    .or_else(|| options.first())
                    .map(|o| {
                        o.value()
                            .attr("value")
                            .map(str::to_string)
                            .unwrap_or_else(|| normalize_whitespace(&o.text().collect::<String>()))
                    })
                    .unwrap_or_default()
            }
            "textarea" => field.text().collect(),
            tag => {
                let default_kind = if tag == "button" { "submit" } else { "text" };
                let kind = el.attr("type").unwrap_or(default_kind).to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "image" | "button" | "reset" => {
                        if Some(field.id()) != control_id {
                            continue;
                        }
                    }
                    "checkbox" | "radio" => {
                        if el.attr("checked").is_none() {
                            continue;
                        }
                    }
                    _ => {}
                }
                el.attr("value").unwrap_or_default().to_string()
            }
        };

        fields.push((name.to_string(), value));
    }

    let action = form
        .value()
        .attr("action")
        .filter(|a| !a.trim().is_empty())
        .map(|a| resolve_url(base, a.trim()))
        .unwrap_or_else(|| base.to_string());

    Some(FormSubmission {
        action,
        method: FormMethod::parse(form.value().attr("method")),
        fields,
    })
}

/// Nearest enclosing `form` element.
pub fn enclosing_form(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "form")
}

/// Find the availability search form: the one holding a control whose
/// value carries the search caption.
pub fn find_search_form(html: &str, page_url: &str, caption: &str) -> Option<FormSubmission> {
    let base = Url::parse(page_url).ok()?;
    let doc = Html::parse_document(html);
    let controls = selector("form input[value], form button")?;

    let control = doc.select(&controls).find(|c| {
        let value = c.value().attr("value").unwrap_or_default();
        value.contains(caption) || c.text().collect::<String>().contains(caption)
    })?;

    form_submission(enclosing_form(control)?, Some(control), &base)
}

/// Resolve the dedicated calendar endpoint referenced from page scripts.
///
/// Prefers `calendar.asp?kid=<id>&lan=<lang>` rebuilt from the stock
/// calendar initialisation call, falling back to the literal script URL.
pub fn find_calendar_script(html: &str, page_url: &str, markup: &LegacyMarkup) -> Option<String> {
    if !html.contains(markup.calendar_script.as_str()) {
        return None;
    }
    let base = Url::parse(page_url).ok()?;

    if let Some(id) = STOCK_CALENDAR_INIT
        .captures(html)
        .and_then(|caps| caps.get(1))
    {
        let href = format!(
            "{}?kid={}&lan={}",
            markup.calendar_script,
            id.as_str(),
            markup.calendar_lang
        );
        return Some(resolve_url(&base, &href));
    }

    let pattern = format!(r#"{}[^"'\s<>]*"#, regex::escape(&markup.calendar_script));
    let literal = Regex::new(&pattern).ok()?;
    literal
        .find(html)
        .map(|m| resolve_url(&base, &m.as_str().replace("&amp;", "&")))
}

/// Outbound links whose text or href carries a calendar keyword.
///
/// The page itself is skipped and each URL is kept once, in page order.
pub fn candidate_links(html: &str, page_url: &str, keywords: &[String]) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();

    doc.select(&anchors)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            let text = a.text().collect::<String>();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                return None;
            }
            keywords
                .iter()
                .any(|k| text.contains(k.as_str()) || href.contains(k.as_str()))
                .then(|| resolve_url(&base, href))
        })
        .filter(|url| url != base.as_str() && url != page_url)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
