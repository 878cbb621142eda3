//! Provider gateway: the completion contract and the network retry wrapper.
//!
//! The engine only ever sees [`CompletionProvider`]: one `complete` call per
//! batch, an optional token-estimator capability, and a model id for metrics.
//! Adapters own the HTTP details; [`ProviderGateway`] owns retries and
//! backoff, so by the time an error reaches the scheduler the provider has
//! already given up.

pub mod anthropic;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod openai;
pub mod selector;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::debug;

use crate::tokenizer::{HeuristicEstimator, TokenEstimate};

pub use error::{ErrorContext, ProviderError};
pub use factory::{
    build_provider, parse_compare_models, ProviderKind, ProviderOptions, ProviderSpec,
};
pub use metrics::{CallMetrics, MetricsCollector, ModelStats};
pub use selector::{MeteredProvider, RoundRobinSelector};

/// Token consumption for one or more completion calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub reasoning_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.reasoning_tokens += other.reasoning_tokens;
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.reasoning_tokens
    }
}

/// Request for one completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// JSON schema hint for providers that support structured output.
    pub schema_hint: Option<serde_json::Value>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema_hint: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn schema(mut self, schema: serde_json::Value) -> Self {
        self.schema_hint = Some(schema);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Response from one completion. The content is untrusted bytes for the
/// prompt layer to parse.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub latency: Duration,
}

/// The contract the engine requires of an LLM provider.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, req: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Optional capability: accurate token counting for batch sizing.
    fn estimate_tokens(&self, _text: &str) -> Option<usize> {
        None
    }

    /// Identifier recorded in metrics and traces, e.g. "openai:gpt-4o-mini".
    fn model_id(&self) -> String;
}

/// Adapts a provider's optional token-estimator capability to
/// [`TokenEstimate`], falling back to the character heuristic.
pub struct ProviderTokenEstimator {
    provider: Arc<dyn CompletionProvider>,
    fallback: HeuristicEstimator,
}

impl ProviderTokenEstimator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            fallback: HeuristicEstimator,
        }
    }
}

impl TokenEstimate for ProviderTokenEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        self.provider
            .estimate_tokens(text)
            .unwrap_or_else(|| self.fallback.estimate_tokens(text))
    }
}

/// Retry policy for the gateway wrapper.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Wraps an adapter with retries and exponential backoff. Rate limits honor
/// the provider's suggested delay; everything else backs off geometrically.
pub struct ProviderGateway {
    inner: Arc<dyn CompletionProvider>,
    config: GatewayConfig,
}

impl ProviderGateway {
    pub fn new(inner: Arc<dyn CompletionProvider>, config: GatewayConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ProviderGateway {
    async fn complete(
        &self,
        req: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.complete(req).await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    let delay = match &err {
                        ProviderError::RateLimited { retry_after, .. } => *retry_after,
                        _ => backoff_delay(self.config.retry_base_delay, attempt),
                    };
                    debug!(
                        model = %self.inner.model_id(),
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "retrying provider call"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn estimate_tokens(&self, text: &str) -> Option<usize> {
        self.inner.estimate_tokens(text)
    }

    fn model_id(&self) -> String {
        self.inner.model_id()
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u64.pow(attempt.min(5));
    base * multiplier as u32
}
