use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{RateLimiter, RefinementRequest, RefinementResponse, RefinementResult};
use crate::config::REFINE_MAX_TOKENS;
use crate::error::ForgeError;
use crate::llm::client::{CompletionClient, CompletionRequest};
use crate::llm::prompts;
use crate::store::{RefinementRecord, RefinementStore};

/// Every way a refinement call can fail, one variant per response status
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("Request body is too large or unreadable")]
    UnreadableBody(String),

    #[error("Too many requests! Wait 1 minute.")]
    RateLimited,

    #[error("Invalid LLM API key. Check the server configuration.")]
    UpstreamAuth,

    #[error("LLM API rate limit exceeded. Try again later.")]
    UpstreamRateLimited,

    #[error("LLM API unavailable. Try again.")]
    UpstreamUnavailable,

    #[error("Failed to refine prompt")]
    Server(String),
}

impl GatewayError {
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Validation(_) | GatewayError::UnreadableBody(_) => 400,
            GatewayError::RateLimited => 429,
            GatewayError::UpstreamAuth => 401,
            GatewayError::UpstreamRateLimited => 429,
            GatewayError::UpstreamUnavailable => 503,
            GatewayError::Server(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: match self {
                GatewayError::Server(details) | GatewayError::UnreadableBody(details) => {
                    Some(details.clone())
                }
                _ => None,
            },
        }
    }

    /// Classify a failed completion call by its upstream status
    pub fn from_upstream(err: ForgeError) -> Self {
        match err.upstream_status() {
            Some(401) => GatewayError::UpstreamAuth,
            Some(429) => GatewayError::UpstreamRateLimited,
            Some(500 | 502 | 503 | 529) => GatewayError::UpstreamUnavailable,
            _ => GatewayError::Server(err.to_string()),
        }
    }
}

/// JSON error body: `{ error, details? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Validates, rate-limits, and forwards refinement requests to the LLM.
///
/// Stateless apart from the rate limiter. Each accepted exchange is
/// persisted by a detached task whose failure is only logged.
pub struct Gateway {
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn RefinementStore>,
    limiter: Arc<dyn RateLimiter>,
    max_tokens: u32,
}

impl Gateway {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        store: Arc<dyn RefinementStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            llm,
            store,
            limiter,
            max_tokens: REFINE_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Count one request against `client_id`, failing once it is over the limit
    pub fn admit(&self, client_id: &str) -> Result<(), GatewayError> {
        let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        if !self.limiter.check_and_record(client_id, now_ms) {
            tracing::warn!(client = client_id, "rate limit exceeded");
            return Err(GatewayError::RateLimited);
        }
        Ok(())
    }

    /// Rate limit, validate, refine, persist in the background, respond.
    pub async fn refine(
        &self,
        body: &Value,
        client_id: &str,
    ) -> Result<RefinementResponse, GatewayError> {
        self.admit(client_id)?;

        let request = RefinementRequest::from_json(body)?;

        tracing::info!(
            kind = %request.kind,
            client = client_id,
            estimated_input_tokens = request.original_prompt.chars().count() / 4,
            "starting refinement"
        );

        let result = self.complete(&request).await.map_err(|e| {
            tracing::error!(error = %e, "refinement failed");
            GatewayError::from_upstream(e)
        })?;

        tracing::info!(tokens = result.total_tokens, "refinement complete");

        self.persist_in_background(&request, &result);

        Ok(RefinementResponse::new(result, request.kind))
    }

    /// Build the instruction pair for `request` and run one completion
    pub async fn complete(
        &self,
        request: &RefinementRequest,
    ) -> crate::error::Result<RefinementResult> {
        let completion_request = CompletionRequest {
            system: prompts::system_prompt(request.kind).to_string(),
            user: prompts::refinement_message(
                &request.original_prompt,
                &request.project_context,
                &request.memory,
                request.kind,
            ),
            max_tokens: self.max_tokens,
        };

        let completion = self.llm.complete(&completion_request).await?;

        Ok(RefinementResult {
            refined_prompt: completion.first_text().to_string(),
            total_tokens: completion.usage.total(),
            input_tokens: completion.usage.input(),
            output_tokens: completion.usage.output(),
        })
    }

    fn persist_in_background(&self, request: &RefinementRequest, result: &RefinementResult) {
        let record = RefinementRecord {
            id: None,
            project_id: request.project_id.clone(),
            problem: request.problem.clone(),
            original_prompt: request.original_prompt.clone(),
            refined_prompt: result.refined_prompt.clone(),
            kind: request.kind.to_string(),
            tokens_used: result.total_tokens,
            resolved: None,
        };
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            match store.insert_refinement(&record).await {
                Ok(id) => tracing::debug!(id = ?id, project = %record.project_id, "refinement saved"),
                Err(e) => tracing::warn!(error = %e, project = %record.project_id, "failed to save refinement"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::llm::client::{Completion, ContentBlock, Usage};
    use crate::refine::{MemoryEntry, RefinementKind, SlidingWindowLimiter};
    use crate::store::EffectiveSolution;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct FakeLlm {
        calls: AtomicUsize,
        last: Mutex<Option<CompletionRequest>>,
        reply: fn() -> Result<Completion>,
    }

    impl FakeLlm {
        fn new(reply: fn() -> Result<Completion>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
                reply,
            })
        }
    }

    #[async_trait]
    impl CompletionClient for FakeLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            (self.reply)()
        }
    }

    fn text_reply() -> Result<Completion> {
        Ok(Completion {
            content: vec![ContentBlock {
                kind: "text".into(),
                text: Some("Refined: find the click handler".into()),
            }],
            usage: Usage {
                input_tokens: Some(120),
                output_tokens: Some(80),
            },
        })
    }

    fn no_text_reply() -> Result<Completion> {
        Ok(Completion {
            content: vec![ContentBlock {
                kind: "tool_use".into(),
                text: None,
            }],
            usage: Usage {
                input_tokens: Some(9),
                output_tokens: None,
            },
        })
    }

    /// Reports inserts on a channel so tests can await the background write
    struct ChannelStore {
        tx: mpsc::UnboundedSender<RefinementRecord>,
        fail: bool,
    }

    #[async_trait]
    impl RefinementStore for ChannelStore {
        async fn insert_refinement(&self, record: &RefinementRecord) -> Result<Option<String>> {
            let _ = self.tx.send(record.clone());
            if self.fail {
                return Err(ForgeError::Store("datastore down".into()));
            }
            Ok(Some("1".into()))
        }

        async fn top_solutions(&self, _project_id: &str, _limit: usize) -> Result<Vec<MemoryEntry>> {
            Ok(Vec::new())
        }

        async fn insert_solution(&self, _solution: &EffectiveSolution) -> Result<()> {
            Ok(())
        }

        async fn mark_resolved(&self, _refinement_id: &str, _resolved: bool) -> Result<()> {
            Ok(())
        }
    }

    fn gateway(
        llm: Arc<FakeLlm>,
        fail_store: bool,
    ) -> (Gateway, mpsc::UnboundedReceiver<RefinementRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Arc::new(ChannelStore { tx, fail: fail_store });
        let limiter = Arc::new(SlidingWindowLimiter::default());
        (Gateway::new(llm, store, limiter), rx)
    }

    fn body() -> Value {
        json!({
            "promptOriginal": "fix bug",
            "contexto": "",
            "tipo": "especifico",
            "problema": "Button does nothing on click",
            "memoria": [],
            "projeto_id": "toolbox"
        })
    }

    #[tokio::test]
    async fn happy_path_returns_refined_prompt_and_persists() {
        let llm = FakeLlm::new(text_reply);
        let (gateway, mut saved) = gateway(llm.clone(), false);

        let response = gateway.refine(&body(), "10.0.0.1").await.unwrap();
        assert_eq!(response.prompt_refinado, "Refined: find the click handler");
        assert_eq!(response.tokens, 200);
        assert_eq!(response.input_tokens, 120);
        assert_eq!(response.output_tokens, 80);
        assert_eq!(response.tipo, RefinementKind::Especifico);

        let sent = llm.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.system, prompts::system_prompt(RefinementKind::Especifico));
        assert!(sent.user.contains(prompts::NO_PRIOR_SOLUTIONS));
        assert_eq!(sent.max_tokens, 2000);

        let record = tokio::time::timeout(Duration::from_secs(2), saved.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.project_id, "toolbox");
        assert_eq!(record.kind, "especifico");
        assert_eq!(record.tokens_used, 200);
        assert_eq!(record.problem, "Button does nothing on click");
    }

    #[tokio::test]
    async fn invalid_kind_never_reaches_llm() {
        let llm = FakeLlm::new(text_reply);
        let (gateway, _saved) = gateway(llm.clone(), false);

        let mut bad = body();
        bad["tipo"] = json!("invalid");
        let err = gateway.refine(&bad, "c").await.unwrap_err();

        assert_eq!(err.status(), 400);
        assert!(err.body().error.contains("especifico, contexto, alternativa, correcao, refinar"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_text_block_yields_empty_prompt_with_usage() {
        let llm = FakeLlm::new(no_text_reply);
        let (gateway, _saved) = gateway(llm, false);

        let response = gateway.refine(&body(), "c").await.unwrap();
        assert_eq!(response.prompt_refinado, "");
        assert_eq!(response.input_tokens, 9);
        assert_eq!(response.output_tokens, 0);
        assert_eq!(response.tokens, 9);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_the_call() {
        let llm = FakeLlm::new(text_reply);
        let (gateway, mut saved) = gateway(llm, true);

        let response = gateway.refine(&body(), "c").await;
        assert!(response.is_ok());
        // The write was attempted
        assert!(tokio::time::timeout(Duration::from_secs(2), saved.recv())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn rate_limit_applies_before_validation() {
        let llm = FakeLlm::new(text_reply);
        let (tx, _rx) = mpsc::unbounded_channel();
        let gateway = Gateway::new(
            llm.clone(),
            Arc::new(ChannelStore { tx, fail: false }),
            Arc::new(SlidingWindowLimiter::new(1, 60_000)),
        );

        let err = gateway.refine(&Value::Null, "c").await.unwrap_err();
        assert_eq!(err.status(), 400);

        let err = gateway.refine(&body(), "c").await.unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited));
        assert_eq!(err.status(), 429);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn memory_lines_reach_the_llm_in_order() {
        let llm = FakeLlm::new(text_reply);
        let (gateway, _saved) = gateway(llm.clone(), false);

        let mut with_memory = body();
        with_memory["memoria"] = json!([
            { "tipo_problema": "first", "solucao": "a", "vezes_usado": 5 },
            { "tipo_problema": "second", "solucao": "b", "vezes_usado": 2 }
        ]);
        gateway.refine(&with_memory, "c").await.unwrap();

        let user = llm.last.lock().unwrap().clone().unwrap().user;
        let first = user.find("- first: a (used 5x)").unwrap();
        let second = user.find("- second: b (used 2x)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn upstream_statuses_are_classified() {
        let status = |s: u16| ForgeError::LlmStatus {
            status: s,
            message: "x".into(),
        };

        assert!(matches!(GatewayError::from_upstream(status(401)), GatewayError::UpstreamAuth));
        assert!(matches!(
            GatewayError::from_upstream(status(429)),
            GatewayError::UpstreamRateLimited
        ));
        assert!(matches!(
            GatewayError::from_upstream(status(500)),
            GatewayError::UpstreamUnavailable
        ));
        assert!(matches!(
            GatewayError::from_upstream(status(529)),
            GatewayError::UpstreamUnavailable
        ));

        let other = GatewayError::from_upstream(status(400));
        assert_eq!(other.status(), 500);
        let body = other.body();
        assert_eq!(body.error, "Failed to refine prompt");
        assert!(body.details.unwrap().contains("400"));
    }

    #[test]
    fn local_and_upstream_rate_limits_read_differently() {
        assert_eq!(GatewayError::RateLimited.status(), GatewayError::UpstreamRateLimited.status());
        assert_ne!(
            GatewayError::RateLimited.body().error,
            GatewayError::UpstreamRateLimited.body().error
        );
    }
}
