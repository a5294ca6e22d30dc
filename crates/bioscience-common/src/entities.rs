/// Wire records exchanged with the bioscience backend.
/// Field names follow the backend's camelCase JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Publications
// ---------------------------------------------------------------------------

/// Publication ids arrive as JSON numbers or strings depending on the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublicationId {
    Number(i64),
    Text(String),
}

impl PublicationId {
    pub fn is_empty(&self) -> bool {
        match self {
            PublicationId::Number(_) => false,
            PublicationId::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationId::Number(n) => write!(f, "{}", n),
            PublicationId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PublicationId {
    fn from(n: i64) -> Self {
        PublicationId::Number(n)
    }
}

impl From<&str> for PublicationId {
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) => PublicationId::Number(n),
            Err(_) => PublicationId::Text(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: PublicationId,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub authors: String,
    pub year: i32,
    #[serde(default)]
    pub r#abstract: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 0–100
    #[serde(default)]
    pub relevance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmc_id: Option<String>,
}

/// Pagination envelope returned by `GET /api/publications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationsResponse {
    pub publications: Vec<Publication>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationStats {
    pub total: u64,
    #[serde(default)]
    pub by_year: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_tag: BTreeMap<String, u64>,
    #[serde(default)]
    pub recent: Vec<Publication>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    Title,
    Year,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::Title     => "title",
            SortBy::Year      => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relevance" => Some(SortBy::Relevance),
            "title"     => Some(SortBy::Title),
            "year"      => Some(SortBy::Year),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc  => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc"  => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

// ---------------------------------------------------------------------------
// AI endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub model: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub role: Role,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    Concise,
    Detailed,
    Technical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<SummaryStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub topic: String,
    pub summary: String,
    pub style: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractType {
    KeyFindings,
    Organisms,
    Methods,
    Results,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_type: Option<ExtractType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub extract_type: String,
    pub extracted: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapsResponse {
    pub area: String,
    pub gaps: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub topic1: String,
    pub topic2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    pub topic1: String,
    pub topic2: String,
    pub comparison: String,
    pub timestamp: String,
}

/// Body of `POST /api/publication-summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationSummaryRequest {
    pub title: String,
    pub authors: String,
    pub year: i32,
    pub tags: Vec<String>,
}

impl From<&Publication> for PublicationSummaryRequest {
    fn from(p: &Publication) -> Self {
        Self {
            title: p.title.clone(),
            authors: p.authors.clone(),
            year: p.year,
            tags: p.tags.clone(),
        }
    }
}

/// Structured AI summary of one publication. Generated per view, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSummary {
    pub objective: String,
    #[serde(default)]
    pub findings: Vec<String>,
    pub implications: String,
}
