//! Provider construction from `provider:model` specs.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::tokenizer::Encoding;

use super::anthropic::{AnthropicAdapter, DEFAULT_ANTHROPIC_BASE_URL};
use super::error::ProviderError;
use super::openai::{OpenAiCompatAdapter, DEFAULT_OPENAI_BASE_URL};
use super::{CompletionProvider, GatewayConfig, ProviderGateway};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Supported provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    fn label(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => DEFAULT_OPENAI_BASE_URL,
            ProviderKind::OpenRouter => DEFAULT_OPENROUTER_BASE_URL,
            ProviderKind::Anthropic => DEFAULT_ANTHROPIC_BASE_URL,
            ProviderKind::Ollama => DEFAULT_OLLAMA_BASE_URL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(ProviderError::config(format!(
                "unknown provider type: {other}"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A `provider:model` pair.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    pub model: String,
}

impl ProviderSpec {
    pub fn new(kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
        }
    }

    /// Parse "provider:model". The model part may itself contain colons
    /// (e.g. "ollama:qwen2.5-coder:32b").
    pub fn parse(spec: &str) -> Result<Self, ProviderError> {
        let (kind, model) = spec.split_once(':').ok_or_else(|| {
            ProviderError::config(format!(
                "invalid model spec {spec:?} (expected provider:model)"
            ))
        })?;
        if model.is_empty() {
            return Err(ProviderError::config(format!(
                "invalid model spec {spec:?} (empty model)"
            )));
        }
        Ok(Self {
            kind: kind.parse()?,
            model: model.to_string(),
        })
    }

    pub fn id(&self) -> String {
        format!("{}:{}", self.kind, self.model)
    }
}

/// Construction knobs shared by all providers.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Overrides the provider's default endpoint (vLLM, proxies, etc.).
    pub base_url: Option<String>,
    pub encoding: Encoding,
    pub timeout: Duration,
    pub gateway: GatewayConfig,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            encoding: Encoding::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            gateway: GatewayConfig::default(),
        }
    }
}

/// Build a retry-wrapped provider for a spec, reading credentials from the
/// provider's environment variable.
pub fn build_provider(
    spec: &ProviderSpec,
    options: &ProviderOptions,
) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    let api_key = match spec.kind.api_key_env() {
        Some(var) => match std::env::var(var) {
            Ok(key) if !key.is_empty() => Some(key),
            _ => {
                return Err(ProviderError::config(format!(
                    "{} provider requires {var} to be set",
                    spec.kind
                )))
            }
        },
        None => std::env::var("OLLAMA_API_KEY").ok().filter(|k| !k.is_empty()),
    };

    let base_url = options
        .base_url
        .clone()
        .unwrap_or_else(|| spec.kind.default_base_url().to_string());

    let adapter: Arc<dyn CompletionProvider> = match spec.kind {
        ProviderKind::Anthropic => {
            let key = api_key.unwrap_or_default();
            Arc::new(AnthropicAdapter::new(
                &key,
                base_url,
                &spec.model,
                options.encoding,
                options.timeout,
            )?)
        }
        kind => Arc::new(OpenAiCompatAdapter::new(
            api_key.as_deref(),
            base_url,
            &spec.model,
            kind.label(),
            options.encoding,
            options.timeout,
        )?),
    };

    Ok(Arc::new(ProviderGateway::new(
        adapter,
        options.gateway.clone(),
    )))
}

/// Parse the comma-separated `compare_models` option into specs.
pub fn parse_compare_models(raw: &str) -> Result<Vec<ProviderSpec>, ProviderError> {
    let specs: Vec<ProviderSpec> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ProviderSpec::parse)
        .collect::<Result<_, _>>()?;
    if specs.is_empty() {
        return Err(ProviderError::config("no models specified for comparison"));
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_model_specs() {
        let spec = ProviderSpec::parse("openai:gpt-4o-mini").unwrap();
        assert_eq!(spec.kind, ProviderKind::OpenAi);
        assert_eq!(spec.model, "gpt-4o-mini");
        assert_eq!(spec.id(), "openai:gpt-4o-mini");

        let spec = ProviderSpec::parse("ollama:qwen2.5-coder:32b").unwrap();
        assert_eq!(spec.kind, ProviderKind::Ollama);
        assert_eq!(spec.model, "qwen2.5-coder:32b");
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(ProviderSpec::parse("gpt-4o-mini").is_err());
        assert!(ProviderSpec::parse("openai:").is_err());
        assert!(ProviderSpec::parse("google:gemini").is_err());
    }

    #[test]
    fn parses_compare_lists() {
        let specs =
            parse_compare_models("openai:gpt-4o-mini, anthropic:claude-3-5-haiku-latest").unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].kind, ProviderKind::Anthropic);

        assert!(parse_compare_models("").is_err());
        assert!(parse_compare_models(" , ").is_err());
    }
}
