mod anthropic;
mod chat;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

pub use anthropic::AnthropicClient;
pub use chat::ChatCompletionClient;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: None,
            api_key: String::new(),
            model: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    pub fn base_url(&self) -> &str {
        let fallback = match self.provider {
            LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
            LlmProvider::OpenAi => OPENAI_BASE_URL,
        };
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(fallback)
            .trim_end_matches('/')
    }

    pub fn model(&self) -> &str {
        let fallback = match self.provider {
            LlmProvider::Anthropic => ANTHROPIC_DEFAULT_MODEL,
            LlmProvider::OpenAi => OPENAI_DEFAULT_MODEL,
        };
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(fallback)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("invalid llm config: {0}")]
    InvalidConfig(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("llm response contained no text")]
    EmptyResponse,
}

/// Prompt in, text out. Providers are interchangeable behind this seam.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

pub fn validate_config(config: &LlmConfig) -> Result<(), LlmError> {
    if config.api_key.trim().is_empty() {
        return Err(LlmError::InvalidConfig("api key is empty".to_string()));
    }
    let base_url = config.base_url();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(LlmError::InvalidConfig(format!(
            "base url must start with http:// or https://, got {base_url:?}"
        )));
    }
    if config.timeout_secs == 0 {
        return Err(LlmError::InvalidConfig("timeout_secs must be positive".to_string()));
    }
    if config.max_tokens == 0 {
        return Err(LlmError::InvalidConfig("max_tokens must be positive".to_string()));
    }
    Ok(())
}

pub fn build_generator(config: &LlmConfig) -> Result<Box<dyn TextGenerator>, LlmError> {
    validate_config(config)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let generator: Box<dyn TextGenerator> = match config.provider {
        LlmProvider::Anthropic => Box::new(AnthropicClient::new(client, config)),
        LlmProvider::OpenAi => Box::new(ChatCompletionClient::new(client, config)),
    };
    Ok(generator)
}

pub async fn call_chat_completion(
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String, LlmError> {
    build_generator(config)?.generate(system, user).await
}

fn non_empty(text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}
