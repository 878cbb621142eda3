//! Shared stub providers for end-to-end tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ordinal_harness::gateway::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, TokenUsage,
};

/// Extract the enumerated `key: value` items from a ranking prompt, in
/// presentation order. Document keys are 8 hex characters, which filters out
/// the instruction lines.
pub fn prompt_items(prompt: &str) -> Vec<(String, String)> {
    prompt
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(": ")?;
            let key = key.trim();
            let is_key =
                key.len() == 8 && key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase());
            is_key.then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

pub fn ranking_reply(keys: &[String]) -> String {
    serde_json::json!({ "ranking": keys }).to_string()
}

/// Deterministic provider driven by a closure over (call index, request).
pub struct ScriptedStub<F> {
    id: String,
    latency: Duration,
    calls: AtomicUsize,
    respond: F,
}

impl<F> ScriptedStub<F>
where
    F: Fn(usize, &CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
{
    pub fn new(id: impl Into<String>, latency: Duration, respond: F) -> Self {
        Self {
            id: id.into(),
            latency,
            calls: AtomicUsize::new(0),
            respond,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> CompletionProvider for ScriptedStub<F>
where
    F: Fn(usize, &CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
{
    async fn complete(
        &self,
        req: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let content = (self.respond)(index, req)?;
        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                reasoning_tokens: 0,
            },
            latency: self.latency,
        })
    }

    fn model_id(&self) -> String {
        self.id.clone()
    }
}

/// Stub that orders every batch by a comparator over the item values.
pub fn order_by_value(
    id: &str,
    latency: Duration,
    compare: fn(&str, &str) -> std::cmp::Ordering,
) -> ScriptedStub<
    impl Fn(usize, &CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
> {
    ScriptedStub::new(id, latency, move |_, req: &CompletionRequest| {
        let mut items = prompt_items(&req.prompt);
        items.sort_by(|a, b| compare(&a.1, &b.1));
        let keys: Vec<String> = items.into_iter().map(|(k, _)| k).collect();
        Ok(ranking_reply(&keys))
    })
}
