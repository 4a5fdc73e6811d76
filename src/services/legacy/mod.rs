// src/services/legacy/mod.rs

//! Legacy HTML reservation pages.
//!
//! The target dates are often not on the landing page. The adapter tries,
//! in order, stopping at the first success:
//!
//! 1. the landing page itself,
//! 2. the availability search form, submitted with the target date,
//! 3. the calendar script endpoint referenced from page scripts,
//! 4. the [`Navigator`], from whichever page is held,
//! 5. calendar-looking links on the landing page, retrying 1-4 from the
//!    first one that shows calendar indicators or the target dates.
//!
//! If every step fails, the last page held is parsed best-effort.

pub mod form;
pub mod navigator;
pub mod page;
pub mod table;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{LegacyHtmlBackend, RoomRecord};
use crate::services::BackendAdapter;

pub use form::{FormMethod, FormSubmission, candidate_links, find_calendar_script, find_search_form};
pub use navigator::{
    ExhaustReason, HttpPageSource, NavState, Navigation, Navigator, NextControl, PageSource,
    find_next_control,
};
pub use page::{Page, TargetDate};
pub use table::{classify_cell, parse_availability, parse_free_text, parse_table};

/// Result of steps 1-4 from one starting page.
#[derive(Debug)]
struct Located {
    page: Page,
    found: bool,
}

/// Adapter for server-rendered reservation pages.
pub struct LegacyHtmlAdapter {
    backend: LegacyHtmlBackend,
    client: Client,
}

impl LegacyHtmlAdapter {
    pub fn new(backend: LegacyHtmlBackend, client: Client) -> Self {
        Self { backend, client }
    }

    fn navigator(&self) -> Navigator {
        Navigator::new(
            self.backend.max_nav_steps,
            Duration::from_millis(self.backend.nav_delay_ms),
            self.backend.markup.next_caption.as_str(),
        )
    }

    /// Run the full procedure against any page source.
    pub async fn run(&self, source: &dyn PageSource) -> Result<Vec<RoomRecord>> {
        if self.backend.target_dates.is_empty() {
            return Err(AppError::config(format!("{}: no target dates", self.backend.name)));
        }
        let targets = TargetDate::all(&self.backend.target_dates);
        let markup = &self.backend.markup;

        let landing = source.get(&self.backend.url).await?;
        let located = self.locate(source, landing.clone(), &targets).await;

        let page = if located.found {
            located.page
        } else {
            match self.follow_candidates(source, &landing, &targets).await {
                Some(candidate) => candidate.page,
                None => {
                    log::warn!(
                        "{}: target dates not located, parsing last page held",
                        self.backend.name
                    );
                    located.page
                }
            }
        };

        let records = parse_availability(
            &page.html,
            &page.text,
            &targets,
            &self.backend.name,
            markup,
        );
        if records.is_empty() {
            log::warn!(
                "{}: no records on {} (dates seen: {:?})",
                self.backend.name,
                page.url,
                page.visible_dates()
            );
        }
        Ok(records)
    }

    /// Steps 1-4 from `start`.
    async fn locate(
        &self,
        source: &dyn PageSource,
        start: Page,
        targets: &[TargetDate],
    ) -> Located {
        let name = &self.backend.name;
        let markup = &self.backend.markup;

        // 1. Landing page
        if start.shows_all(targets) {
            log::info!("{}: target dates visible on {}", name, start.url);
            return Located { page: start, found: true };
        }

        // 2. Search form
        let mut held = start;
        if let Some(mut form) = find_search_form(&held.html, &held.url, &markup.search_caption) {
            form.apply_date(targets[0].date);
            log::info!("{}: submitting search form to {}", name, form.action);
            match source.submit(&form).await {
                Ok(page) => {
                    if page.shows_all(targets) {
                        return Located { page, found: true };
                    }
                    held = page;
                }
                Err(e) => log::warn!("{}: search form failed: {}", name, e),
            }
        }

        // 3. Calendar script endpoint
        if let Some(url) = find_calendar_script(&held.html, &held.url, markup) {
            log::info!("{}: trying calendar endpoint {}", name, url);
            match source.get(&url).await {
                Ok(page) if page.html.trim() == "Not Found" => {
                    log::warn!("{}: calendar endpoint returned 'Not Found'", name);
                }
                Ok(page) if page.shows_all(targets) => return Located { page, found: true },
                Ok(_) => log::debug!("{}: calendar endpoint lacks target dates", name),
                Err(e) => log::warn!("{}: calendar endpoint failed: {}", name, e),
            }
        }

        // 4. Navigator. A month heading alone still lets the landing-page
        // links have a go.
        let Navigation { state, page, .. } = self.navigator().navigate(source, held, targets).await;
        let found = state == NavState::Found && page.shows_any_token(targets);
        if state == NavState::Found && !found {
            log::debug!("{}: month label found on {} but no target date", name, page.url);
        }
        Located { page, found }
    }

    /// Step 5: retry from the first landing-page link that looks like a
    /// calendar.
    async fn follow_candidates(
        &self,
        source: &dyn PageSource,
        landing: &Page,
        targets: &[TargetDate],
    ) -> Option<Located> {
        let name = &self.backend.name;
        let keywords = &self.backend.markup.calendar_keywords;
        let links = candidate_links(&landing.html, &landing.url, keywords);
        log::info!("{}: {} candidate calendar links", name, links.len());

        for url in links {
            let page = match source.get(&url).await {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("{}: failed to open {}: {}", name, url, e);
                    continue;
                }
            };

            if page.shows_all(targets) || page.has_calendar_indicators(&self.backend.markup) {
                log::info!("{}: calendar candidate {}", name, url);
                return Some(self.locate(source, page, targets).await);
            }
            log::debug!("{}: {} has no calendar indicators", name, url);
        }

        None
    }
}

#[async_trait]
impl BackendAdapter for LegacyHtmlAdapter {
    fn name(&self) -> &str {
        &self.backend.name
    }

    fn kind(&self) -> &'static str {
        "legacy_html"
    }

    async fn fetch(&self) -> Result<Vec<RoomRecord>> {
        let source = HttpPageSource::new(self.client.clone());
        self.run(&source).await
    }
}
