//! Post-pass relevance justification for surviving documents.
//!
//! One single-item call per survivor, under the same admission semaphore as
//! the ranking trials. Failures leave the document unannotated; scores and
//! ranks are never touched here.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::document::RankedDocument;
use crate::gateway::{CompletionProvider, CompletionRequest, TokenUsage};
use crate::prompts::{build_relevance_prompt, parse_relevance_reply, relevance_schema};

/// Output cap for a justification reply.
pub const RELEVANCE_MAX_OUTPUT_TOKENS: u32 = 256;

pub async fn annotate_survivors(
    provider: Arc<dyn CompletionProvider>,
    semaphore: Arc<Semaphore>,
    initial_prompt: &str,
    concurrency: usize,
    survivors: &mut [RankedDocument],
) -> TokenUsage {
    let jobs = survivors.iter().enumerate().map(|(idx, doc)| {
        let provider = provider.clone();
        let semaphore = semaphore.clone();
        let prompt = build_relevance_prompt(initial_prompt, &doc.value);
        let key = doc.key.clone();
        async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (idx, None, TokenUsage::default());
            };
            let request = CompletionRequest::new(prompt)
                .schema(relevance_schema())
                .max_tokens(RELEVANCE_MAX_OUTPUT_TOKENS);
            match provider.complete(&request).await {
                Ok(response) => (idx, parse_relevance_reply(&response.content), response.usage),
                Err(err) => {
                    warn!(key = %key, error = %err, "relevance call failed");
                    (idx, None, TokenUsage::default())
                }
            }
        }
    });

    let results = stream::iter(jobs)
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut usage = TokenUsage::default();
    for (idx, relevance, call_usage) in results {
        usage.add(call_usage);
        survivors[idx].relevance = relevance;
    }
    usage
}
