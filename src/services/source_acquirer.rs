use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;

use crate::{
    errors::{AppError, AppResult},
    models::domain::QuizSource,
};

/// Raw fetch result before any cleanup.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub content_type: String,
    pub body: String,
}

/// Boundary to the network. Kept as a trait so the pipeline can be exercised
/// without touching the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AppResult<FetchedContent>;
}

pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

impl HttpSourceFetcher {
    pub fn new(timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; SmartQuizBot/1.0)")
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, url: &str) -> AppResult<FetchedContent> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch(format!("GET {} returned {}", url, status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        Ok(FetchedContent { content_type, body })
    }
}

static MARKUP_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>|<nav\b.*?</nav>|<header\b.*?</header>|<footer\b.*?</footer>|<!--.*?-->",
    )
    .expect("markup block pattern is valid")
});
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Turns a URL or a literal prompt into the clean source text the templater
/// consumes. The URL path fetches, strips markup and bounds the result; the
/// prompt path validates and passes the text through unchanged.
pub struct SourceAcquirer {
    fetcher: Arc<dyn SourceFetcher>,
    min_source_chars: usize,
    max_source_chars: usize,
    max_prompt_chars: usize,
}

impl SourceAcquirer {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        min_source_chars: usize,
        max_source_chars: usize,
        max_prompt_chars: usize,
    ) -> Self {
        Self {
            fetcher,
            min_source_chars,
            max_source_chars,
            max_prompt_chars,
        }
    }

    pub async fn acquire(&self, source: &QuizSource) -> AppResult<String> {
        match source {
            QuizSource::Prompt(text) => self.validate_prompt(text),
            QuizSource::Url(url) => self.acquire_from_url(url).await,
        }
    }

    fn validate_prompt(&self, text: &str) -> AppResult<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidPrompt("Prompt must not be empty".into()));
        }

        let length = trimmed.chars().count();
        if length > self.max_prompt_chars {
            return Err(AppError::InvalidPrompt(format!(
                "Prompt is {} chars, maximum is {}",
                length, self.max_prompt_chars
            )));
        }

        Ok(trimmed.to_string())
    }

    async fn acquire_from_url(&self, url: &str) -> AppResult<String> {
        let fetched = self.fetcher.fetch(url).await?;

        if !is_textual_content(&fetched.content_type) {
            return Err(AppError::UnsupportedContent(format!(
                "Content type '{}' from {} is not text",
                fetched.content_type, url
            )));
        }

        let text = extract_text(&fetched.body);
        let length = text.chars().count();
        if length < self.min_source_chars {
            return Err(AppError::ContentTooShort {
                length,
                minimum: self.min_source_chars,
            });
        }

        Ok(truncate_at_sentence(&text, self.max_source_chars))
    }
}

fn is_textual_content(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.is_empty() || ct.contains("text/") || ct.contains("html") || ct.contains("xml")
}

/// Strip scripts, styles, chrome sections and remaining tags, decode the
/// common entities and collapse whitespace.
pub fn extract_text(html: &str) -> String {
    let without_blocks = MARKUP_BLOCKS.replace_all(html, " ");
    let without_tags = TAGS.replace_all(&without_blocks, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Truncate to at most `max_chars`, preferring to cut at the last sentence
/// boundary in the final fifth of the window so the model never sees a
/// half-finished sentence.
pub fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut_byte = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let window = &text[..cut_byte];

    let floor_byte = text
        .char_indices()
        .nth(max_chars.saturating_sub(max_chars / 5))
        .map(|(i, _)| i)
        .unwrap_or(0);

    match window.rfind('.') {
        Some(dot) if dot >= floor_byte => window[..=dot].to_string(),
        _ => window.to_string(),
    }
}
