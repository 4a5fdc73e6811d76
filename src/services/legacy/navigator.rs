// src/services/legacy/navigator.rs

//! Calendar navigator.
//!
//! Pages through "next period" controls until the target month is shown.
//! The walk is bounded: it ends in [`NavState::Exhausted`] after
//! `max_steps` steps even if every page offers another control.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Result;
use crate::services::legacy::form::{FormMethod, FormSubmission, enclosing_form, form_submission};
use crate::services::legacy::page::{Page, TargetDate};
use crate::utils::http::into_fetched;
use crate::utils::resolve_url;

/// Where pages come from. The HTTP implementation is [`HttpPageSource`].
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page>;

    async fn submit(&self, form: &FormSubmission) -> Result<Page>;
}

/// Fetches pages with a shared client (and its cookie store).
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn get(&self, url: &str) -> Result<Page> {
        let response = self.client.get(url).send().await?;
        Ok(into_fetched(response).await?.into())
    }

    async fn submit(&self, form: &FormSubmission) -> Result<Page> {
        let request = match form.method {
            FormMethod::Get => self.client.get(&form.action).query(&form.fields),
            FormMethod::Post => self.client.post(&form.action).form(&form.fields),
        };
        let response = request.send().await?;
        Ok(into_fetched(response).await?.into())
    }
}

/// Why navigation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustReason {
    StepLimit,
    NoControl,
    FetchFailed(String),
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::StepLimit => f.write_str("step limit reached"),
            ExhaustReason::NoControl => f.write_str("no next-period control"),
            ExhaustReason::FetchFailed(e) => write!(f, "fetch failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Seeking,
    Found,
    Exhausted(ExhaustReason),
}

impl NavState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NavState::Seeking)
    }
}

/// Outcome of a walk: the terminal state and the last page held.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub state: NavState,
    pub page: Page,
    pub steps: usize,
}

/// How to reach the next period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextControl {
    Link(String),
    Form(FormSubmission),
}

/// Locate the "next period" control on a page.
///
/// Markup varies, so several equivalent lookups are tried in order: link
/// text, input value, link title, button text, any element whose own text
/// carries the caption, and finally an input value containing it.
pub fn find_next_control(html: &str, page_url: &str, caption: &str) -> Option<NextControl> {
    let base = Url::parse(page_url).ok()?;
    let doc = Html::parse_document(html);
    let caption = caption.trim();
    let value_of = |el: &ElementRef<'_>, attr: &str| {
        el.value().attr(attr).map(str::trim).map(str::to_string)
    };

    let mut candidates: Vec<ElementRef<'_>> = Vec::new();
    candidates.extend(select_all(&doc, "a").into_iter().filter(|a| own_text(a) == caption));
    candidates.extend(
        select_all(&doc, "input[value]")
            .into_iter()
            .filter(|i| value_of(i, "value").as_deref() == Some(caption)),
    );
    candidates.extend(
        select_all(&doc, "a[title]")
            .into_iter()
            .filter(|a| value_of(a, "title").as_deref() == Some(caption)),
    );
    candidates.extend(select_all(&doc, "button").into_iter().filter(|b| own_text(b) == caption));
    candidates.extend(
        select_all(&doc, "a, button")
            .into_iter()
            .filter(|el| own_text(el).contains(caption)),
    );
    candidates.extend(
        select_all(&doc, "input[value]")
            .into_iter()
            .filter(|i| value_of(i, "value").is_some_and(|v| v.contains(caption))),
    );

    candidates.into_iter().find_map(|el| control_for(el, &base))
}

fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|s| doc.select(&s).collect())
        .unwrap_or_default()
}

fn own_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn control_for(el: ElementRef<'_>, base: &Url) -> Option<NextControl> {
    if el.value().name() == "a" {
        let href = el.value().attr("href").map(str::trim).unwrap_or_default();
        if !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:") {
            return Some(NextControl::Link(resolve_url(base, href)));
        }
    }
    let form = enclosing_form(el)?;
    form_submission(form, Some(el), base).map(NextControl::Form)
}

/// Bounded walk over next-period controls.
#[derive(Debug, Clone)]
pub struct Navigator {
    pub max_steps: usize,
    pub delay: Duration,
    pub caption: String,
}

impl Navigator {
    pub fn new(max_steps: usize, delay: Duration, caption: impl Into<String>) -> Self {
        Self {
            max_steps,
            delay,
            caption: caption.into(),
        }
    }

    /// Walk from `start` until the target month is shown or the walk is
    /// exhausted. Never returns `Seeking`.
    pub async fn navigate(
        &self,
        source: &dyn PageSource,
        start: Page,
        targets: &[TargetDate],
    ) -> Navigation {
        let mut page = start;
        let mut steps = 0;

        let state = loop {
            if page.shows_month(targets) {
                log::info!("Target month displayed after {} steps", steps);
                break NavState::Found;
            }
            if steps >= self.max_steps {
                break NavState::Exhausted(ExhaustReason::StepLimit);
            }

            let Some(control) = find_next_control(&page.html, &page.url, &self.caption) else {
                break NavState::Exhausted(ExhaustReason::NoControl);
            };

            if steps > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            log::debug!("Period {:?}, following next control", page.visible_dates());
            let next = match &control {
                NextControl::Link(url) => source.get(url).await,
                NextControl::Form(form) => source.submit(form).await,
            };
            steps += 1;

            match next {
                Ok(next) => page = next,
                Err(e) => break NavState::Exhausted(ExhaustReason::FetchFailed(e.to_string())),
            }
        };

        if let NavState::Exhausted(reason) = &state {
            log::warn!("Navigation exhausted after {} steps: {}", steps, reason);
        }

        Navigation { state, page, steps }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use super::*;
    use crate::error::AppError;

    const NEXT: &str = "後の期間";

    fn targets() -> Vec<TargetDate> {
        TargetDate::all(&[NaiveDate::from_ymd_opt(2025, 10, 24).unwrap()])
    }

    fn period_page(n: usize) -> Page {
        Page::new(
            format!("https://example.com/cal.asp?p={n}"),
            format!(
                r#"<table><tr><td>8/{n}</td></tr></table><a href="cal.asp?p={}">{NEXT}</a>"#,
                n + 1
            ),
        )
    }

    /// Serves an endless sequence of periods; optionally shows the target
    /// after `found_at` requests.
    struct Endless {
        calls: AtomicUsize,
        found_at: Option<usize>,
    }

    impl Endless {
        fn new(found_at: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                found_at,
            }
        }
    }

    #[async_trait]
    impl PageSource for Endless {
        async fn get(&self, _url: &str) -> Result<Page> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.found_at == Some(n) {
                return Ok(Page::new("https://example.com/cal.asp", "<td>10/24</td>"));
            }
            Ok(period_page(n))
        }

        async fn submit(&self, _form: &FormSubmission) -> Result<Page> {
            Err(AppError::parse("endless", "unexpected submit"))
        }
    }

    #[tokio::test]
    async fn test_navigator_terminates_exhausted_within_step_limit() {
        let source = Endless::new(None);
        let nav = Navigator::new(15, Duration::ZERO, NEXT);
        let result = nav.navigate(&source, period_page(0), &targets()).await;

        assert_eq!(result.state, NavState::Exhausted(ExhaustReason::StepLimit));
        assert_eq!(result.steps, 15);
        assert_eq!(source.calls.load(Ordering::SeqCst), 15);
        assert!(result.state.is_terminal());
    }

    #[tokio::test]
    async fn test_navigator_finds_target() {
        let source = Endless::new(Some(3));
        let nav = Navigator::new(15, Duration::ZERO, NEXT);
        let result = nav.navigate(&source, period_page(0), &targets()).await;

        assert_eq!(result.state, NavState::Found);
        assert_eq!(result.steps, 3);
        assert!(result.page.text.contains("10/24"));
    }

    #[tokio::test]
    async fn test_navigator_without_control() {
        let source = Endless::new(None);
        let nav = Navigator::new(15, Duration::ZERO, NEXT);
        let start = Page::new("https://example.com/", "<p>8/1</p>");
        let result = nav.navigate(&source, start, &targets()).await;

        assert_eq!(result.state, NavState::Exhausted(ExhaustReason::NoControl));
        assert_eq!(result.steps, 0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_last_page() {
        let source = Endless::new(None);
        let nav = Navigator::new(15, Duration::ZERO, NEXT);
        let html = format!(
            r#"<form action="cal.asp" method="post"><input type="submit" name="n" value="{NEXT}"></form>"#
        );
        let start = Page::new("https://example.com/", html);
        let result = nav.navigate(&source, start, &targets()).await;

        assert!(matches!(result.state, NavState::Exhausted(ExhaustReason::FetchFailed(_))));
        assert_eq!(result.page.url, "https://example.com/");
    }

    #[test]
    fn test_next_control_strategies() {
        let base = "https://example.com/asp/cal.asp";

        let link = find_next_control(r#"<a href="cal.asp?p=2">後の期間</a>"#, base, NEXT);
        assert_eq!(link, Some(NextControl::Link("https://example.com/asp/cal.asp?p=2".into())));

        let html = r#"<a href="next.asp" title="後の期間"><img src="x.gif"></a>"#;
        let titled = find_next_control(html, base, NEXT);
        assert_eq!(titled, Some(NextControl::Link("https://example.com/asp/next.asp".into())));

        let html = r#"<a href="n.asp"><span>&gt;&gt; 後の期間</span></a>"#;
        let wrapped = find_next_control(html, base, NEXT);
        assert_eq!(wrapped, Some(NextControl::Link("https://example.com/asp/n.asp".into())));

        let form = find_next_control(
            r#"<form action="cal.asp" method="post">
                 <input type="hidden" name="p" value="2">
                 <input type="submit" name="next" value="後の期間">
               </form>"#,
            base,
            NEXT,
        );
        let Some(NextControl::Form(form)) = form else {
            panic!("expected form control");
        };
        assert_eq!(form.method, FormMethod::Post);
        assert_eq!(form.field("p"), Some("2"));
        assert_eq!(form.field("next"), Some(NEXT));

        let button = find_next_control(
            r#"<form action="c.asp"><button type="submit" name="b">後の期間</button></form>"#,
            base,
            NEXT,
        );
        let Some(NextControl::Form(button)) = button else {
            panic!("expected button control");
        };
        assert_eq!(button.action, "https://example.com/asp/c.asp");

        assert_eq!(find_next_control("<a href='x'>前の期間</a>", base, NEXT), None);
    }
}
