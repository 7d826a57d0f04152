use std::collections::HashMap;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
};

/// Recognized model parameters for a completion call.
#[derive(Debug, Clone)]
pub struct ModelParameters {
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelParameters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_id: config.model_id.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// The completion service boundary. One prompt in, raw text out; every
/// failure is classified retryable or not so the pipeline can apply its
/// backoff policy without knowing transport details.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, params: &ModelParameters) -> AppResult<String>;
}

pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
    timeout: Duration,
    cache: Option<PromptCache>,
}

impl OpenAiCompletionClient {
    pub fn new(config: &Config) -> Self {
        let openai_config =
            OpenAIConfig::new().with_api_key(config.openai_api_key.expose_secret());

        Self {
            client: Client::with_config(openai_config),
            timeout: Duration::from_secs(config.completion_timeout_secs),
            cache: (config.prompt_cache_entries > 0)
                .then(|| PromptCache::new(config.prompt_cache_entries)),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    async fn complete(&self, prompt: &str, params: &ModelParameters) -> AppResult<String> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(prompt).await {
                log::debug!("Prompt cache hit");
                return Ok(hit);
            }
        }

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(classify_openai_error)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&params.model_id)
            .temperature(params.temperature)
            .max_completion_tokens(params.max_tokens)
            .messages([message.into()])
            .build()
            .map_err(classify_openai_error)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::CompletionService {
                message: format!("Completion timed out after {:?}", self.timeout),
                retryable: true,
            })?
            .map_err(classify_openai_error)?;

        if let Some(usage) = &response.usage {
            log::debug!(
                "Completion usage: prompt={} completion={} total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::CompletionService {
                message: "Completion service returned an empty response".into(),
                retryable: true,
            });
        }

        if let Some(cache) = &self.cache {
            cache.put(prompt, &text).await;
        }

        Ok(text)
    }
}

/// Transport failures and server-side errors are worth retrying; a request
/// the service rejected as malformed is not.
fn classify_openai_error(err: OpenAIError) -> AppError {
    let retryable = match &err {
        OpenAIError::Reqwest(_) => true,
        OpenAIError::ApiError(api) => {
            let message = api.message.to_ascii_lowercase();
            api.r#type.as_deref() == Some("server_error")
                || message.contains("rate limit")
                || message.contains("overloaded")
                || message.contains("timeout")
        }
        _ => false,
    };

    AppError::CompletionService {
        message: err.to_string(),
        retryable,
    }
}

/// Bounded in-memory prompt cache keyed by SHA-256 of the prompt. Kept
/// process-local; cleared wholesale when full rather than tracking recency.
struct PromptCache {
    entries: RwLock<HashMap<String, String>>,
    capacity: usize,
}

impl PromptCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    fn key(prompt: &str) -> String {
        let digest = Sha256::digest(prompt.as_bytes());
        format!("{:x}", digest)
    }

    async fn get(&self, prompt: &str) -> Option<String> {
        self.entries.read().await.get(&Self::key(prompt)).cloned()
    }

    async fn put(&self, prompt: &str, response: &str) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.clear();
        }
        entries.insert(Self::key(prompt), response.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prompt_cache_round_trip() {
        let cache = PromptCache::new(2);
        assert!(cache.get("prompt-a").await.is_none());

        cache.put("prompt-a", "response-a").await;
        assert_eq!(cache.get("prompt-a").await.as_deref(), Some("response-a"));
        assert!(cache.get("prompt-b").await.is_none());
    }

    #[tokio::test]
    async fn prompt_cache_evicts_when_full() {
        let cache = PromptCache::new(1);
        cache.put("prompt-a", "response-a").await;
        cache.put("prompt-b", "response-b").await;

        assert!(cache.get("prompt-a").await.is_none());
        assert_eq!(cache.get("prompt-b").await.as_deref(), Some("response-b"));
    }

    #[test]
    fn cache_keys_differ_per_prompt() {
        assert_ne!(PromptCache::key("a"), PromptCache::key("b"));
        assert_eq!(PromptCache::key("a"), PromptCache::key("a"));
    }

    #[test]
    fn model_parameters_come_from_config() {
        let config = Config::test_config();
        let params = ModelParameters::from_config(&config);

        assert_eq!(params.model_id, config.model_id);
        assert_eq!(params.max_tokens, config.max_tokens);
    }
}
