//! Anthropic messages adapter.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::tokenizer::{Encoding, TiktokenEstimator, TokenEstimate};

use super::error::{ErrorContext, ProviderError};
use super::{CompletionProvider, CompletionRequest, CompletionResponse, TokenUsage};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic requires max_tokens on every request.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Adapter for the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    model_id: String,
    estimator: TiktokenEstimator,
}

impl AnthropicAdapter {
    pub fn new(
        api_key: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        encoding: Encoding,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url.into();
        let model = model.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        let key_value = HeaderValue::from_str(api_key)
            .map_err(|_| ProviderError::config("invalid API key format"))?;
        headers.insert("x-api-key", key_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("failed to create HTTP client: {e}")))?;

        let model_id = format!("anthropic:{model}");
        Ok(Self {
            client,
            base_url,
            model,
            model_id,
            estimator: TiktokenEstimator::new(encoding),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn retry_after(headers: &reqwest::header::HeaderMap) -> Duration {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60))
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct MessagesApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesApiResponse {
    content: Option<Vec<ContentBlock>>,
    usage: Option<Usage>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

// =============================================================================
// PROVIDER IMPL
// =============================================================================

#[async_trait::async_trait]
impl CompletionProvider for AnthropicAdapter {
    async fn complete(
        &self,
        req: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let start = Instant::now();

        let api_req = MessagesApiRequest {
            model: &self.model,
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![ApiMessage {
                role: "user",
                content: &req.prompt,
            }],
            temperature: req.temperature,
        };

        let response = self
            .client
            .post(self.messages_url())
            .json(&api_req)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        let ctx = ErrorContext::new().with_status(status.as_u16());

        if !status.is_success() {
            let parsed_error = serde_json::from_str::<MessagesApiResponse>(&body)
                .ok()
                .and_then(|r| r.error);
            let message = parsed_error
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            let ctx = match parsed_error.and_then(|e| e.error_type) {
                Some(code) => ctx.with_code(code),
                None => ctx,
            };

            return Err(match status.as_u16() {
                401 | 403 => ProviderError::auth(message, ctx),
                429 => ProviderError::rate_limited(Self::retry_after(&headers), ctx),
                // 529 is Anthropic's "overloaded"; treat like a 5xx.
                s => ProviderError::provider_with_context("anthropic", message, s >= 500, ctx),
            });
        }

        let parsed: MessagesApiResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::provider("anthropic", format!("invalid JSON: {e}"), false)
        })?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::provider(
                "anthropic",
                error.message.unwrap_or_default(),
                false,
            ));
        }

        let content: String = parsed
            .content
            .unwrap_or_default()
            .into_iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text)
            .collect();

        if content.is_empty() {
            return Err(ProviderError::provider(
                "anthropic",
                "no text content in response",
                false,
            ));
        }

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.input_tokens.unwrap_or(0),
                output_tokens: u.output_tokens.unwrap_or(0),
                reasoning_tokens: 0,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            usage,
            latency: start.elapsed(),
        })
    }

    fn estimate_tokens(&self, text: &str) -> Option<usize> {
        Some(self.estimator.estimate_tokens(text))
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }
}
