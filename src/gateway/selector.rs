//! Round-robin provider rotation with per-call metrics.
//!
//! For head-to-head model comparison the engine is handed a
//! [`MeteredProvider`]: each call goes to the next provider in the rotation
//! and its latency, tokens, and outcome land in the shared collector. A
//! single-model run can use the same decorator with a one-entry rotation.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::error::ProviderError;
use super::metrics::{CallMetrics, MetricsCollector};
use super::{CompletionProvider, CompletionRequest, CompletionResponse};

/// Rotates over a fixed provider sequence.
pub struct RoundRobinSelector {
    providers: Vec<Arc<dyn CompletionProvider>>,
    next: Mutex<usize>,
}

impl RoundRobinSelector {
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>) -> Result<Self, ProviderError> {
        if providers.is_empty() {
            return Err(ProviderError::config("no providers configured"));
        }
        Ok(Self {
            providers,
            next: Mutex::new(0),
        })
    }

    pub fn select(&self) -> Arc<dyn CompletionProvider> {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let provider = self.providers[*next % self.providers.len()].clone();
        *next += 1;
        provider
    }

    pub fn providers(&self) -> &[Arc<dyn CompletionProvider>] {
        &self.providers
    }
}

/// Decorator that rotates providers per call and records metrics.
pub struct MeteredProvider {
    selector: RoundRobinSelector,
    metrics: Arc<MetricsCollector>,
}

impl MeteredProvider {
    pub fn new(selector: RoundRobinSelector, metrics: Arc<MetricsCollector>) -> Self {
        Self { selector, metrics }
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for MeteredProvider {
    async fn complete(
        &self,
        req: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let provider = self.selector.select();
        let model_id = provider.model_id();
        let start = Instant::now();

        let result = provider.complete(req).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let record = match &result {
            Ok(resp) => CallMetrics {
                model_id,
                latency_ms,
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
                success: true,
                error_kind: None,
            },
            Err(err) => CallMetrics {
                model_id,
                latency_ms,
                input_tokens: 0,
                output_tokens: 0,
                success: false,
                error_kind: Some(err.code().to_string()),
            },
        };
        self.metrics.record(record);

        result
    }

    fn estimate_tokens(&self, text: &str) -> Option<usize> {
        self.selector.providers()[0].estimate_tokens(text)
    }

    fn model_id(&self) -> String {
        let ids: Vec<String> = self
            .selector
            .providers()
            .iter()
            .map(|p| p.model_id())
            .collect();
        ids.join(",")
    }
}
