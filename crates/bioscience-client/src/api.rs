//! Typed client for the bioscience backend.
//!
//! Endpoints:
//!   GET  /health
//!   POST /api/ask, /api/chat, /api/summarize, /api/extract, /api/gaps, /api/compare
//!   GET  /api/publications, /api/publications/{id}, /api/publications/stats
//!   POST /api/publication-summary
//!
//! The client never retries; callers that want retries go through the
//! query cache with a `RetryPolicy`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::form_urlencoded;

use bioscience_common::entities::*;
use bioscience_common::error::ApiError;

use crate::transport::{HttpMethod, HttpRequest, Transport};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Parameters of `GET /api/publications`.
///
/// Unset, empty and zero values are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationQuery {
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub tags: Option<Vec<String>>,
}

impl PublicationQuery {
    pub fn to_query_string(&self) -> String {
        let mut qs = form_urlencoded::Serializer::new(String::new());
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            qs.append_pair("search", search);
        }
        if let Some(limit) = self.limit.filter(|&n| n != 0) {
            qs.append_pair("limit", &limit.to_string());
        }
        if let Some(offset) = self.offset.filter(|&n| n != 0) {
            qs.append_pair("offset", &offset.to_string());
        }
        if let Some(sort_by) = self.sort_by {
            qs.append_pair("sortBy", sort_by.as_str());
        }
        if let Some(sort_order) = self.sort_order {
            qs.append_pair("sortOrder", sort_order.as_str());
        }
        if let Some(year) = self.year_from.filter(|&y| y != 0) {
            qs.append_pair("yearFrom", &year.to_string());
        }
        if let Some(year) = self.year_to.filter(|&y| y != 0) {
            qs.append_pair("yearTo", &year.to_string());
        }
        if let Some(ref tags) = self.tags {
            for tag in tags {
                qs.append_pair("tags", tag);
            }
        }
        qs.finish()
    }

    pub fn endpoint(&self) -> String {
        let qs = self.to_query_string();
        if qs.is_empty() {
            "/api/publications".to_string()
        } else {
            format!("/api/publications?{}", qs)
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base_url", &self.base_url).finish()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a JSON request to `base_url + endpoint` and decodes the body as `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self.transport.send(HttpRequest { method, url, body }).await?;

        if !resp.is_success() {
            let payload = serde_json::from_str::<serde_json::Value>(&resp.body).ok();
            let err = ApiError::from_status(resp.status, payload.as_ref());
            warn!(endpoint, status = resp.status, error = %err, "Backend returned an error");
            return Err(err);
        }

        serde_json::from_str(&resp.body).map_err(ApiError::from)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(HttpMethod::Post, endpoint, Some(body)).await
    }

    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.request(HttpMethod::Get, "/health", None).await
    }

    #[instrument(skip(self, req))]
    pub async fn ask(&self, req: &AskRequest) -> Result<AskResponse, ApiError> {
        self.post("/api/ask", req).await
    }

    #[instrument(skip(self, req), fields(history = req.history.len()))]
    pub async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.post("/api/chat", req).await
    }

    #[instrument(skip(self, req), fields(topic = %req.topic))]
    pub async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse, ApiError> {
        self.post("/api/summarize", req).await
    }

    #[instrument(skip(self, req))]
    pub async fn extract(&self, req: &ExtractRequest) -> Result<ExtractResponse, ApiError> {
        self.post("/api/extract", req).await
    }

    #[instrument(skip(self))]
    pub async fn find_gaps(&self, req: &GapsRequest) -> Result<GapsResponse, ApiError> {
        self.post("/api/gaps", req).await
    }

    #[instrument(skip(self))]
    pub async fn compare(&self, req: &CompareRequest) -> Result<CompareResponse, ApiError> {
        self.post("/api/compare", req).await
    }

    #[instrument(skip(self))]
    pub async fn publications(&self, query: &PublicationQuery) -> Result<PublicationsResponse, ApiError> {
        let endpoint = query.endpoint();
        debug!(%endpoint, "Listing publications");
        self.request(HttpMethod::Get, &endpoint, None).await
    }

    #[instrument(skip(self))]
    pub async fn publication(&self, id: &PublicationId) -> Result<Publication, ApiError> {
        self.request(HttpMethod::Get, &format!("/api/publications/{}", id), None).await
    }

    #[instrument(skip(self))]
    pub async fn publication_stats(&self) -> Result<PublicationStats, ApiError> {
        self.request(HttpMethod::Get, "/api/publications/stats", None).await
    }

    #[instrument(skip(self, req), fields(title = %req.title))]
    pub async fn publication_summary(&self, req: &PublicationSummaryRequest) -> Result<AiSummary, ApiError> {
        self.post("/api/publication-summary", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FnTransport, HttpResponse};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    fn client_with(
        recorded: Arc<Mutex<Vec<HttpRequest>>>,
        status: u16,
        body: serde_json::Value,
    ) -> ApiClient {
        let transport = FnTransport::new(move |req: &HttpRequest| {
            recorded.lock().unwrap().push(req.clone());
            Ok(HttpResponse::json(status, &body))
        });
        ApiClient::new("http://backend:8000/", Arc::new(transport))
    }

    #[test]
    fn test_empty_query_uses_bare_path() {
        assert_eq!(PublicationQuery::default().endpoint(), "/api/publications");
    }

    #[test]
    fn test_query_string_repeats_tags_and_skips_zero() {
        let q = PublicationQuery {
            search: Some("bone loss".into()),
            limit: Some(15),
            offset: Some(0),
            sort_by: Some(SortBy::Year),
            sort_order: Some(SortOrder::Asc),
            year_from: Some(2020),
            year_to: None,
            tags: Some(vec!["ISS".into(), "Bone Health".into()]),
        };
        assert_eq!(
            q.to_query_string(),
            "search=bone+loss&limit=15&sortBy=year&sortOrder=asc&yearFrom=2020&tags=ISS&tags=Bone+Health"
        );
    }

    #[tokio::test]
    async fn test_request_builds_url_and_decodes() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(recorded.clone(), 200, json!({"status": "healthy", "model": "gemini"}));

        let health = client.health().await.unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.model.as_deref(), Some("gemini"));

        let reqs = recorded.lock().unwrap();
        assert_eq!(reqs[0].url, "http://backend:8000/health");
        assert_eq!(reqs[0].method, HttpMethod::Get);
        assert!(reqs[0].body.is_none());
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(
            recorded.clone(),
            200,
            json!({"topic1": "a", "topic2": "b", "comparison": "c", "timestamp": "t"}),
        );
        let req = CompareRequest { topic1: "a".into(), topic2: "b".into() };
        let resp = client.compare(&req).await.unwrap();
        assert_eq!(resp.comparison, "c");

        let reqs = recorded.lock().unwrap();
        assert_eq!(reqs[0].url, "http://backend:8000/api/compare");
        assert_eq!(reqs[0].method, HttpMethod::Post);
        assert_eq!(reqs[0].body, Some(json!({"topic1": "a", "topic2": "b"})));
    }

    #[tokio::test]
    async fn test_error_status_carries_server_message() {
        let client = client_with(Arc::new(Mutex::new(Vec::new())), 500, json!({"error": "model overloaded"}));
        let err = client.ask(&AskRequest { question: "q".into(), context: None }).await.unwrap_err();
        assert_eq!(err, ApiError::Status { status: 500, message: "model overloaded".into() });
    }

    #[tokio::test]
    async fn test_error_status_without_payload() {
        let transport = FnTransport::new(|_req: &HttpRequest| {
            Ok(HttpResponse { status: 502, body: "<html>bad gateway</html>".into() })
        });
        let client = ApiClient::new(DEFAULT_BASE_URL, Arc::new(transport));
        let err = client.publication_stats().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 502");
    }

    #[tokio::test]
    async fn test_unparsable_body_is_decode_error() {
        let transport = FnTransport::new(|_req: &HttpRequest| {
            Ok(HttpResponse { status: 200, body: "not json".into() })
        });
        let client = ApiClient::new(DEFAULT_BASE_URL, Arc::new(transport));
        let err = client.publication(&PublicationId::Number(1)).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = FnTransport::new(|_req: &HttpRequest| {
            Err(ApiError::Transport("connection refused".into()))
        });
        let client = ApiClient::new(DEFAULT_BASE_URL, Arc::new(transport));
        let err = client.health().await.unwrap_err();
        assert_eq!(err, ApiError::Transport("connection refused".into()));
    }
}
