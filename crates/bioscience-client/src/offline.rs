//! In-process backend over the sample dataset.
//!
//! Serves the read endpoints so the client and CLI can be used without a
//! running server. Endpoints that need a language model answer 503.

use async_trait::async_trait;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use bioscience_common::entities::{Publication, PublicationStats, PublicationsResponse, SortBy, SortOrder};
use bioscience_common::error::ApiError;
use bioscience_common::fixtures;

use crate::transport::{HttpMethod, HttpRequest, HttpResponse, Transport};

const DEFAULT_LIMIT: usize = 20;
const RECENT_COUNT: usize = 10;

#[derive(Debug, Clone)]
pub struct OfflineTransport {
    publications: Vec<Publication>,
}

impl Default for OfflineTransport {
    fn default() -> Self {
        Self::new(fixtures::sample_publications())
    }
}

/// Filters parsed from the list endpoint's query string.
#[derive(Debug, Default)]
struct ListParams {
    search: String,
    limit: Option<usize>,
    offset: usize,
    sort_by: SortBy,
    sort_order: SortOrder,
    year_from: Option<i32>,
    year_to: Option<i32>,
    tags: Vec<String>,
}

impl ListParams {
    fn from_url(url: &Url) -> Self {
        let mut p = ListParams::default();
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "search" => p.search = v.into_owned(),
                "limit" => p.limit = v.parse().ok(),
                "offset" => p.offset = v.parse().unwrap_or(0),
                "sortBy" => p.sort_by = SortBy::parse(&v).unwrap_or_default(),
                "sortOrder" => p.sort_order = SortOrder::parse(&v).unwrap_or_default(),
                "yearFrom" => p.year_from = v.parse().ok(),
                "yearTo" => p.year_to = v.parse().ok(),
                "tags" => p.tags.push(v.into_owned()),
                _ => {}
            }
        }
        p
    }

    fn accepts(&self, publication: &Publication) -> bool {
        self.year_from.map_or(true, |y| publication.year >= y)
            && self.year_to.map_or(true, |y| publication.year <= y)
            && self.tags.iter().all(|t| publication.tags.contains(t))
    }
}

fn compare(a: &Publication, b: &Publication, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Relevance => a.relevance.total_cmp(&b.relevance),
        SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortBy::Year => a.year.cmp(&b.year),
    }
}

fn not_found(what: &str) -> HttpResponse {
    HttpResponse::json(404, &json!({ "error": format!("{} not found", what) }))
}

impl OfflineTransport {
    pub fn new(publications: Vec<Publication>) -> Self {
        Self { publications }
    }

    fn list(&self, url: &Url) -> HttpResponse {
        let params = ListParams::from_url(url);
        let mut hits: Vec<&Publication> = fixtures::search(&params.search, &self.publications)
            .into_iter()
            .filter(|p| params.accepts(p))
            .collect();
        hits.sort_by(|a, b| {
            let ord = compare(a, b, params.sort_by);
            match params.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = hits.len();
        let limit = params.limit.filter(|&n| n > 0).unwrap_or(DEFAULT_LIMIT);
        let page: Vec<&Publication> = hits.into_iter().skip(params.offset).take(limit).collect();
        let body = json!({
            "publications": page,
            "total": total,
            "limit": limit,
            "offset": params.offset,
            "hasMore": params.offset + limit < total,
        });
        HttpResponse::json(200, &body)
    }

    fn stats(&self) -> Result<HttpResponse, ApiError> {
        let mut by_year: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_tag: BTreeMap<String, u64> = BTreeMap::new();
        for p in &self.publications {
            *by_year.entry(p.year.to_string()).or_default() += 1;
            for tag in &p.tags {
                *by_tag.entry(tag.clone()).or_default() += 1;
            }
        }
        let mut recent = self.publications.clone();
        recent.sort_by(|a, b| b.year.cmp(&a.year));
        recent.truncate(RECENT_COUNT);

        let stats = PublicationStats { total: self.publications.len() as u64, by_year, by_tag, recent };
        Ok(HttpResponse::json(200, &serde_json::to_value(&stats)?))
    }

    fn one(&self, id: &str) -> Result<HttpResponse, ApiError> {
        match self.publications.iter().find(|p| p.id.to_string() == id) {
            Some(p) => Ok(HttpResponse::json(200, &serde_json::to_value(p)?)),
            None => Ok(not_found("Publication")),
        }
    }

    fn route(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = Url::parse(&req.url).map_err(|e| ApiError::Transport(format!("Invalid URL {}: {}", req.url, e)))?;
        let path = url.path().trim_end_matches('/');

        match (req.method, path) {
            (HttpMethod::Get, "/health") => Ok(HttpResponse::json(
                200,
                &json!({ "status": "healthy", "model": "offline", "apiKey": "not required" }),
            )),
            (HttpMethod::Get, "/api/publications") => Ok(self.list(&url)),
            (HttpMethod::Get, "/api/publications/stats") => self.stats(),
            (HttpMethod::Get, p) if p.starts_with("/api/publications/") => {
                self.one(&p["/api/publications/".len()..])
            }
            (HttpMethod::Post, p) if p.starts_with("/api/") => Ok(HttpResponse::json(
                503,
                &json!({ "error": "AI features are unavailable in offline mode" }),
            )),
            _ => Ok(not_found("Endpoint")),
        }
    }
}

#[async_trait]
impl Transport for OfflineTransport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = req.method.as_str(), url = %req.url, "Offline request");
        self.route(&req)
    }
}
