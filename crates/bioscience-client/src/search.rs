//! Search, filter and pagination state.
//!
//! Phases: Idle -> Debouncing (keystroke) -> Fetching (after the quiet
//! period) -> Success | Error. Any filter change, or a new debounced query,
//! sends the session back to page 1.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use bioscience_common::entities::{PublicationsResponse, SortBy, SortOrder};
use bioscience_common::error::ApiError;

use crate::api::PublicationQuery;
use crate::queries::Queries;

pub const PAGE_SIZE: u32 = 15;
pub const DEBOUNCE: Duration = Duration::from_millis(300);
const MAX_VISIBLE_PAGES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Debouncing,
    Fetching,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub tags: Vec<String>,
}

/// One slot of the pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    phase: SearchPhase,
    input: String,
    debounced: String,
    deadline: Option<Instant>,
    filters: SearchFilters,
    page: u32,
    page_size: u32,
    debounce: Duration,
    total: u64,
    response: Option<PublicationsResponse>,
    error: Option<ApiError>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(PAGE_SIZE, DEBOUNCE)
    }
}

impl SearchSession {
    pub fn new(page_size: u32, debounce: Duration) -> Self {
        Self {
            phase: SearchPhase::Idle,
            input: String::new(),
            debounced: String::new(),
            deadline: None,
            filters: SearchFilters::default(),
            page: 1,
            page_size: page_size.max(1),
            debounce,
            total: 0,
            response: None,
            error: None,
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn debounced_query(&self) -> &str {
        &self.debounced
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn response(&self) -> Option<&PublicationsResponse> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    // ── Free-text query ─────────────────────────────────────────────────────

    pub fn type_query(&mut self, text: impl Into<String>, now: Instant) {
        self.input = text.into();
        self.deadline = Some(now + self.debounce);
        self.phase = SearchPhase::Debouncing;
    }

    /// When the debounce deadline falls due.
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Commits the typed text once the quiet period has passed. Returns true
    /// when the debounced query changed; the session is then `Fetching` until
    /// `finish` records the new query's result.
    pub fn poll_debounce(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.input != self.debounced {
                    self.debounced = self.input.clone();
                    self.page = 1;
                    self.phase = SearchPhase::Fetching;
                    debug!(query = %self.debounced, "Search query settled");
                    true
                } else {
                    self.phase = self.settled_phase();
                    false
                }
            }
            _ => false,
        }
    }

    /// Waits out the debounce period, then commits.
    pub async fn settle(&mut self) -> bool {
        if let Some(deadline) = self.deadline {
            tokio::time::sleep_until(deadline).await;
        }
        self.poll_debounce(Instant::now())
    }

    fn settled_phase(&self) -> SearchPhase {
        if self.error.is_some() {
            SearchPhase::Error
        } else if self.response.is_some() {
            SearchPhase::Success
        } else {
            SearchPhase::Idle
        }
    }

    // ── Filters ─────────────────────────────────────────────────────────────

    pub fn set_sort(&mut self, sort_by: SortBy, sort_order: SortOrder) {
        self.filters.sort_by = sort_by;
        self.filters.sort_order = sort_order;
        self.page = 1;
    }

    pub fn set_year_range(&mut self, from: Option<i32>, to: Option<i32>) {
        self.filters.year_from = from;
        self.filters.year_to = to;
        self.page = 1;
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.filters.tags = tags;
        self.page = 1;
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(pos) = self.filters.tags.iter().position(|t| t == tag) {
            self.filters.tags.remove(pos);
        } else {
            self.filters.tags.push(tag.to_string());
        }
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters = SearchFilters::default();
        self.page = 1;
    }

    // ── Pagination ──────────────────────────────────────────────────────────

    pub fn total_pages(&self) -> u32 {
        self.total.div_ceil(self.page_size as u64) as u32
    }

    /// Moves to `page`, clamped into `[1, total_pages]`.
    pub fn go_to_page(&mut self, page: u32) -> u32 {
        let last = self.total_pages().max(1);
        self.page = page.clamp(1, last);
        self.page
    }

    pub fn next_page(&mut self) -> u32 {
        self.go_to_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> u32 {
        self.go_to_page(self.page.saturating_sub(1))
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }

    /// Pagination bar: every page when there are few, otherwise a window
    /// around the current page with the first and last page pinned.
    pub fn page_numbers(&self) -> Vec<PageItem> {
        let total = self.total_pages();
        if total <= MAX_VISIBLE_PAGES {
            return (1..=total).map(PageItem::Page).collect();
        }

        let mut items = Vec::new();
        let start = self.page.saturating_sub(2).max(1);
        let end = (start + MAX_VISIBLE_PAGES - 1).min(total);

        if start > 1 {
            items.push(PageItem::Page(1));
            if start > 2 {
                items.push(PageItem::Ellipsis);
            }
        }
        items.extend((start..=end).map(PageItem::Page));
        if end < total {
            if end < total - 1 {
                items.push(PageItem::Ellipsis);
            }
            items.push(PageItem::Page(total));
        }
        items
    }

    // ── Fetching ────────────────────────────────────────────────────────────

    pub fn query(&self) -> PublicationQuery {
        PublicationQuery {
            search: Some(self.debounced.clone()).filter(|s| !s.is_empty()),
            limit: Some(self.page_size),
            offset: Some(self.offset()),
            sort_by: Some(self.filters.sort_by),
            sort_order: Some(self.filters.sort_order),
            year_from: self.filters.year_from,
            year_to: self.filters.year_to,
            tags: Some(self.filters.tags.clone()).filter(|t| !t.is_empty()),
        }
    }

    pub fn begin_fetch(&mut self) -> PublicationQuery {
        self.phase = SearchPhase::Fetching;
        self.query()
    }

    pub fn finish(&mut self, result: Result<PublicationsResponse, ApiError>) {
        match result {
            Ok(resp) => {
                self.total = resp.total;
                self.response = Some(resp);
                self.error = None;
                self.phase = SearchPhase::Success;
            }
            Err(e) => {
                self.error = Some(e);
                self.phase = SearchPhase::Error;
            }
        }
    }

    /// Fetches the current page through the query cache.
    pub async fn run(&mut self, queries: &Queries) -> Result<&PublicationsResponse, ApiError> {
        let query = self.begin_fetch();
        let result = queries.publications(&query).await;
        self.finish(result);
        match (&self.response, &self.error) {
            (_, Some(e)) => Err(e.clone()),
            (Some(resp), None) => Ok(resp),
            (None, None) => Err(ApiError::Decode("empty search response".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with_total(total: u64) -> SearchSession {
        let mut s = SearchSession::default();
        s.finish(Ok(PublicationsResponse {
            publications: vec![],
            total,
            limit: PAGE_SIZE as u64,
            offset: 0,
            has_more: total > PAGE_SIZE as u64,
        }));
        s
    }

    #[test]
    fn test_every_page_maps_to_its_offset() {
        let mut s = with_total(608);
        assert_eq!(s.total_pages(), 41);
        for p in 1..=s.total_pages() {
            s.go_to_page(p);
            assert_eq!(s.query().offset, Some((p - 1) * 15));
            assert_eq!(s.query().limit, Some(15));
        }
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut s = with_total(40);
        assert_eq!(s.total_pages(), 3);
        assert_eq!(s.go_to_page(0), 1);
        assert_eq!(s.go_to_page(9), 3);
        assert_eq!(s.next_page(), 3);
        assert_eq!(s.prev_page(), 2);

        let mut empty = SearchSession::default();
        assert_eq!(empty.total_pages(), 0);
        assert_eq!(empty.go_to_page(4), 1);
        assert_eq!(empty.prev_page(), 1);
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut s = with_total(300);
        let changes: Vec<Box<dyn Fn(&mut SearchSession)>> = vec![
            Box::new(|s| s.set_sort(SortBy::Year, SortOrder::Asc)),
            Box::new(|s| s.set_sort(SortBy::Relevance, SortOrder::Desc)),
            Box::new(|s| s.set_year_range(Some(2015), None)),
            Box::new(|s| s.set_year_range(Some(2015), Some(2022))),
            Box::new(|s| s.set_tags(vec!["ISS".into()])),
            Box::new(|s| s.toggle_tag("Plant Biology")),
            Box::new(|s| s.toggle_tag("ISS")),
            Box::new(|s| s.clear_filters()),
        ];
        for change in changes {
            s.go_to_page(7);
            assert_eq!(s.current_page(), 7);
            change(&mut s);
            assert_eq!(s.current_page(), 1);
        }
    }

    #[test]
    fn test_debounce_waits_for_quiet_period() {
        let mut s = with_total(300);
        s.go_to_page(4);
        let t0 = Instant::now();

        s.type_query("b", t0);
        s.type_query("bo", t0 + Duration::from_millis(100));
        s.type_query("bone", t0 + Duration::from_millis(200));
        assert_eq!(s.phase(), SearchPhase::Debouncing);

        assert!(!s.poll_debounce(t0 + Duration::from_millis(450)));
        assert_eq!(s.debounced_query(), "");
        assert_eq!(s.current_page(), 4);

        assert!(s.poll_debounce(t0 + Duration::from_millis(500)));
        assert_eq!(s.debounced_query(), "bone");
        assert_eq!(s.current_page(), 1);
        assert_eq!(s.phase(), SearchPhase::Fetching);
        assert_eq!(s.query().search.as_deref(), Some("bone"));
    }

    #[test]
    fn test_unchanged_query_keeps_page() {
        let mut s = with_total(300);
        let t0 = Instant::now();
        s.go_to_page(3);
        s.type_query("", t0);
        assert!(!s.poll_debounce(t0 + DEBOUNCE));
        assert_eq!(s.current_page(), 3);
        assert_eq!(s.phase(), SearchPhase::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_sleeps_until_deadline() {
        let mut s = SearchSession::default();
        let start = Instant::now();
        s.type_query("plant", start);
        assert!(s.settle().await);
        assert_eq!(start.elapsed(), DEBOUNCE);
        assert_eq!(s.phase(), SearchPhase::Fetching);
    }

    #[test]
    fn test_query_omits_empty_search_and_tags() {
        let s = SearchSession::default();
        let q = s.query();
        assert_eq!(q.search, None);
        assert_eq!(q.tags, None);
        assert_eq!(q.offset, Some(0));
        assert_eq!(q.sort_by, Some(SortBy::Relevance));
        assert_eq!(q.sort_order, Some(SortOrder::Desc));
    }

    #[test]
    fn test_page_numbers_window() {
        use PageItem::*;
        assert_eq!(with_total(60).page_numbers(), vec![Page(1), Page(2), Page(3), Page(4)]);

        let mut s = with_total(150);
        assert_eq!(s.page_numbers(), vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(10)]);

        s.go_to_page(6);
        assert_eq!(
            s.page_numbers(),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Page(7), Page(8), Ellipsis, Page(10)]
        );

        s.go_to_page(10);
        assert_eq!(s.page_numbers(), vec![Page(1), Ellipsis, Page(8), Page(9), Page(10)]);
    }

    #[test]
    fn test_error_phase_keeps_previous_total() {
        let mut s = with_total(45);
        s.begin_fetch();
        assert_eq!(s.phase(), SearchPhase::Fetching);
        s.finish(Err(ApiError::Timeout(30)));
        assert_eq!(s.phase(), SearchPhase::Error);
        assert_eq!(s.total_pages(), 3);
        assert_eq!(s.error(), Some(&ApiError::Timeout(30)));
    }
}
