//! HTTP transport seam.
//!
//! `ApiClient` speaks to the backend through the `Transport` trait so the
//! same typed client runs over reqwest, the offline fixture backend, or a
//! scripted transport in tests.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

use bioscience_common::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get  => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Fully qualified URL, including the query string.
    pub url: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self { status, body: value.to_string() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the raw response.
///
/// Implementations only fail for transport-level problems; non-2xx statuses
/// are returned as responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Production transport over `reqwest` with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("bioscience-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    fn map_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout.as_secs())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let builder = match req.method {
            HttpMethod::Get  => self.client.get(&req.url),
            HttpMethod::Post => self.client.post(&req.url),
        };
        let builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json");
        let builder = match req.body {
            Some(ref body) => builder.body(body.to_string()),
            None => builder,
        };

        let resp = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| self.map_error(e))?;
        debug!(method = req.method.as_str(), url = %req.url, status, "HTTP exchange");
        Ok(HttpResponse { status, body })
    }
}

/// Transport backed by a closure, for stubbing a backend in-process.
pub struct FnTransport<F> {
    handler: F,
}

impl<F> FnTransport<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> Transport for FnTransport<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync,
{
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        (self.handler)(&req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::json(200, &json!({})).is_success());
        assert!(HttpResponse::json(204, &json!({})).is_success());
        assert!(!HttpResponse::json(302, &json!({})).is_success());
        assert!(!HttpResponse::json(500, &json!({})).is_success());
    }

    #[test]
    fn test_reqwest_transport_builds() {
        let t = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        assert_eq!(t.timeout, Duration::from_secs(5));
    }
}
