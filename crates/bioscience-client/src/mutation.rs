//! One-shot side-effecting requests.
//!
//! A `Mutation` runs its operation exactly once per `mutate` call, never
//! retries, and publishes `Idle -> Pending -> Success | Error` on a watch
//! channel so views can follow along.

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use bioscience_common::entities::*;
use bioscience_common::error::ApiError;

use crate::api::ApiClient;
use crate::cache::QueryCache;

#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<T> {
    Idle,
    Pending,
    Success(T),
    Error(ApiError),
}

impl<T> MutationState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            MutationState::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            MutationState::Error(e) => Some(e),
            _ => None,
        }
    }
}

type Operation<Req, Res> = Arc<dyn Fn(Req) -> BoxFuture<'static, Result<Res, ApiError>> + Send + Sync>;
type SuccessHook<Res> = Arc<dyn Fn(&Res) + Send + Sync>;

pub struct Mutation<Req, Res> {
    name: &'static str,
    operation: Operation<Req, Res>,
    on_success: Option<SuccessHook<Res>>,
    state: watch::Sender<MutationState<Res>>,
}

impl<Req, Res> Mutation<Req, Res>
where
    Req: Send + 'static,
    Res: Clone + Send + Sync + 'static,
{
    pub fn new<F>(name: &'static str, operation: F) -> Self
    where
        F: Fn(Req) -> BoxFuture<'static, Result<Res, ApiError>> + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(MutationState::Idle);
        Self { name, operation: Arc::new(operation), on_success: None, state }
    }

    pub fn on_success<H>(mut self, hook: H) -> Self
    where
        H: Fn(&Res) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn mutate(&self, req: Req) -> Result<Res, ApiError> {
        self.state.send_replace(MutationState::Pending);
        debug!(mutation = self.name, "Mutation started");

        let result = (self.operation)(req).await;
        match &result {
            Ok(res) => {
                if let Some(hook) = &self.on_success {
                    hook(res);
                }
                self.state.send_replace(MutationState::Success(res.clone()));
            }
            Err(e) => {
                debug!(mutation = self.name, error = %e, "Mutation failed");
                self.state.send_replace(MutationState::Error(e.clone()));
            }
        }
        result
    }

    pub fn reset(&self) {
        self.state.send_replace(MutationState::Idle);
    }

    pub fn state(&self) -> MutationState<Res> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState<Res>> {
        self.state.subscribe()
    }
}

/// Builds the backend's mutations over one client.
#[derive(Clone)]
pub struct Mutations {
    client: ApiClient,
    cache: QueryCache,
}

macro_rules! client_mutation {
    ($fn_name:ident, $label:literal, $method:ident, $req:ty, $res:ty) => {
        pub fn $fn_name(&self) -> Mutation<$req, $res> {
            let client = self.client.clone();
            Mutation::new($label, move |req: $req| {
                let client = client.clone();
                async move { client.$method(&req).await }.boxed()
            })
        }
    };
}

impl Mutations {
    pub fn new(client: ApiClient, cache: QueryCache) -> Self {
        Self { client, cache }
    }

    /// A successful answer invalidates the `questions` bucket.
    pub fn ask(&self) -> Mutation<AskRequest, AskResponse> {
        let client = self.client.clone();
        let cache = self.cache.clone();
        Mutation::new("ask", move |req: AskRequest| {
            let client = client.clone();
            async move { client.ask(&req).await }.boxed()
        })
        .on_success(move |_res: &AskResponse| {
            cache.invalidate("questions");
        })
    }

    client_mutation!(chat, "chat", chat, ChatRequest, ChatResponse);
    client_mutation!(summarize, "summarize", summarize, SummarizeRequest, SummarizeResponse);
    client_mutation!(extract, "extract", extract, ExtractRequest, ExtractResponse);
    client_mutation!(find_gaps, "findGaps", find_gaps, GapsRequest, GapsResponse);
    client_mutation!(compare, "compare", compare, CompareRequest, CompareResponse);
    client_mutation!(
        publication_summary,
        "publicationSummary",
        publication_summary,
        PublicationSummaryRequest,
        AiSummary
    );
}
