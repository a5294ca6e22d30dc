//! Cached reads and the health poller.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bioscience_common::entities::{HealthResponse, Publication, PublicationId, PublicationStats, PublicationsResponse};
use bioscience_common::error::ApiError;

use crate::api::{ApiClient, PublicationQuery};
use crate::cache::{QueryCache, QueryKey, QueryPolicy};

/// Observable lifecycle of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Idle,
    Loading,
    Success(T),
    Error(ApiError),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ApiError>> for QueryState<T> {
    fn from(r: Result<T, ApiError>) -> Self {
        match r {
            Ok(v) => QueryState::Success(v),
            Err(e) => QueryState::Error(e),
        }
    }
}

/// Per-operation policies for the read operations.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPolicies {
    pub health: QueryPolicy,
    pub publications: QueryPolicy,
    pub publication: QueryPolicy,
    pub publication_stats: QueryPolicy,
}

impl Default for QueryPolicies {
    fn default() -> Self {
        Self {
            health: QueryPolicy::health(),
            publications: QueryPolicy::publications(),
            publication: QueryPolicy::publication(),
            publication_stats: QueryPolicy::publication_stats(),
        }
    }
}

/// Read operations routed through the shared cache.
#[derive(Clone)]
pub struct Queries {
    client: ApiClient,
    cache: QueryCache,
    policies: Arc<QueryPolicies>,
}

impl Queries {
    pub fn new(client: ApiClient, cache: QueryCache, policies: QueryPolicies) -> Self {
        Self { client, cache, policies: Arc::new(policies) }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn policies(&self) -> &QueryPolicies {
        &self.policies
    }

    pub fn health_key() -> QueryKey {
        QueryKey::new("health")
    }

    pub fn publications_key(query: &PublicationQuery) -> Result<QueryKey, ApiError> {
        QueryKey::with_params("publications", query)
    }

    pub fn publication_key(id: &PublicationId) -> Result<QueryKey, ApiError> {
        QueryKey::with_params("publication", id)
    }

    pub fn publication_stats_key() -> QueryKey {
        QueryKey::new("publicationStats")
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let client = self.client.clone();
        self.cache
            .fetch(Self::health_key(), &self.policies.health, move || {
                let client = client.clone();
                async move { client.health().await }
            })
            .await
    }

    pub async fn publications(&self, query: &PublicationQuery) -> Result<PublicationsResponse, ApiError> {
        let client = self.client.clone();
        let q = query.clone();
        self.cache
            .fetch(Self::publications_key(query)?, &self.policies.publications, move || {
                let client = client.clone();
                let q = q.clone();
                async move { client.publications(&q).await }
            })
            .await
    }

    /// An empty id leaves the query disabled; no request is made.
    pub async fn publication(&self, id: &PublicationId) -> Result<Publication, ApiError> {
        if id.is_empty() {
            return Err(ApiError::InvalidInput("publication id is empty".to_string()));
        }
        let client = self.client.clone();
        let id_owned = id.clone();
        self.cache
            .fetch(Self::publication_key(id)?, &self.policies.publication, move || {
                let client = client.clone();
                let id = id_owned.clone();
                async move { client.publication(&id).await }
            })
            .await
    }

    pub async fn publication_stats(&self) -> Result<PublicationStats, ApiError> {
        let client = self.client.clone();
        self.cache
            .fetch(Self::publication_stats_key(), &self.policies.publication_stats, move || {
                let client = client.clone();
                async move { client.publication_stats().await }
            })
            .await
    }
}

/// Polls `/health` on the policy's refetch interval and publishes the
/// result. Polling stops when the monitor is dropped.
pub struct HealthMonitor {
    rx: watch::Receiver<QueryState<HealthResponse>>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    pub fn spawn(queries: Queries) -> Self {
        let (tx, rx) = watch::channel(QueryState::Idle);
        let interval = queries
            .policies()
            .health
            .refetch_interval
            .unwrap_or(std::time::Duration::from_secs(30));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Keep showing the last result while a background refetch runs.
                if matches!(*tx.borrow(), QueryState::Idle) {
                    tx.send_replace(QueryState::Loading);
                }
                let state = QueryState::from(queries.health().await);
                match &state {
                    QueryState::Success(h) => debug!(status = ?h.status, "Health check"),
                    QueryState::Error(e) => warn!(error = %e, "Health check failed"),
                    _ => {}
                }
                if tx.send(state).is_err() {
                    info!("Health monitor has no subscribers, stopping");
                    break;
                }
            }
        });

        Self { rx, task }
    }

    pub fn current(&self) -> QueryState<HealthResponse> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<HealthResponse>> {
        self.rx.clone()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FnTransport, HttpRequest, HttpResponse};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn queries_with<F>(handler: F) -> Queries
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync + 'static,
    {
        let client = ApiClient::new("http://backend", Arc::new(FnTransport::new(handler)));
        Queries::new(client, QueryCache::default(), QueryPolicies::default())
    }

    #[tokio::test]
    async fn test_empty_publication_id_is_disabled() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let queries = queries_with(move |_req: &HttpRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::json(200, &json!({})))
        });
        let err = queries.publication(&PublicationId::Text(String::new())).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_failures_retry_three_times_then_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let queries = queries_with(move |_req: &HttpRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::json(500, &json!({"error": "model unavailable"})))
        });

        let err = queries.health().await.unwrap_err();
        assert_eq!(err.to_string(), "model unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 4, "one attempt plus three retries");
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_monitor_polls_every_interval() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let queries = queries_with(move |_req: &HttpRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::json(200, &json!({"status": "healthy", "model": "gemini-pro"})))
        });

        let monitor = HealthMonitor::spawn(queries);
        let mut rx = monitor.subscribe();
        let start = tokio::time::Instant::now();
        rx.wait_for(|s| s.data().is_some()).await.unwrap();
        assert!(monitor.current().data().unwrap().is_healthy());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        rx.changed().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_secs(30));

        rx.changed().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_monitor_keeps_last_state_while_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let queries = queries_with(move |_req: &HttpRequest| {
            // Healthy on the first poll, failing from then on.
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(HttpResponse::json(200, &json!({"status": "healthy"})))
            } else {
                Ok(HttpResponse::json(503, &json!({"error": "model unavailable"})))
            }
        });

        let monitor = HealthMonitor::spawn(queries);
        let mut rx = monitor.subscribe();
        let start = tokio::time::Instant::now();
        rx.wait_for(|s| s.data().is_some()).await.unwrap();

        // Second poll at 30s, retries at 31s, 33s and 37s.
        tokio::time::sleep_until(start + Duration::from_secs(36)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(monitor.current().data().is_some(), "previous result shown during retries");

        rx.wait_for(|s| s.error().is_some()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5, "one poll plus three retries");
        assert_eq!(start.elapsed(), Duration::from_secs(37));
        assert_eq!(monitor.current().error().map(|e| e.to_string()).as_deref(), Some("model unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_cached_for_ten_minutes() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let queries = queries_with(move |_req: &HttpRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::json(200, &json!({
                "total": 2, "byYear": {"2020": 1, "2021": 1}, "byTag": {}, "recent": []
            })))
        });

        queries.publication_stats().await.unwrap();
        tokio::time::advance(Duration::from_secs(9 * 60)).await;
        queries.publication_stats().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        queries.publication_stats().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_query_state_accessors() {
        let s: QueryState<u32> = Ok(3).into();
        assert_eq!(s.data(), Some(&3));
        let s: QueryState<u32> = Err(ApiError::Timeout(30)).into();
        assert_eq!(s.error(), Some(&ApiError::Timeout(30)));
        assert!(QueryState::<u32>::Loading.is_loading());
    }
}
