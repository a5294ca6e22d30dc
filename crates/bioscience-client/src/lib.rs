//! bioscience-client — Typed access to the NASA bioscience backend.
//!
//! - `transport`: the HTTP seam (reqwest in production, fixtures offline)
//! - `api`: one typed method per backend endpoint
//! - `cache` / `retry`: fingerprint-keyed query cache with staleness windows
//! - `queries` / `mutation`: read and one-shot write lifecycles
//! - `search`, `debounce`, `conversation`, `dashboard`, `typing`: client-side state
//! - `offline`: in-process backend over the sample dataset

pub mod transport;
pub mod api;
pub mod retry;
pub mod cache;
pub mod queries;
pub mod mutation;
pub mod search;
pub mod debounce;
pub mod conversation;
pub mod dashboard;
pub mod typing;
pub mod offline;

pub use api::{ApiClient, PublicationQuery, DEFAULT_BASE_URL};
pub use cache::{QueryCache, QueryKey, QueryPolicy};
pub use conversation::Conversation;
pub use dashboard::DashboardStats;
pub use debounce::Debouncer;
pub use mutation::{Mutation, MutationState, Mutations};
pub use offline::OfflineTransport;
pub use queries::{HealthMonitor, Queries, QueryPolicies, QueryState};
pub use retry::RetryPolicy;
pub use search::{PageItem, SearchPhase, SearchSession};
pub use transport::{FnTransport, HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use typing::TypingAnimation;
