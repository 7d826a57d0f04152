use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    errors::AppResult,
    models::domain::{Difficulty, QuestionType, Quiz, QuizSource},
    services::{
        completion_client::{CompletionBackend, ModelParameters},
        prompt_templater::TemplateSet,
        quiz_assembler::{QuizAssembler, QuizMetadata},
        quiz_parser::QuizParser,
        source_acquirer::SourceAcquirer,
    },
};

/// Everything a single generation request carries into the pipeline.
#[derive(Debug, Clone)]
pub struct QuizGenerationInput {
    pub source: QuizSource,
    pub question_type: QuestionType,
    pub count: u32,
    pub difficulty: Difficulty,
    pub title: Option<String>,
    pub topic: Option<String>,
    pub tags: Vec<String>,
    pub user_id: String,
}

#[derive(Debug)]
pub struct GeneratedQuiz {
    pub quiz: Quiz,
    /// Present when fewer questions survived parsing than were requested.
    pub warning: Option<String>,
}

/// Bounded exponential backoff applied only to retryable completion failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.completion_max_retries,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs the generation stages strictly in order: acquire source text, render
/// the prompt, call the completion service, parse, assemble and store.
/// Nothing is persisted until the assembler's single atomic insert, so an
/// abort at any earlier stage leaves no partial writes.
pub struct GenerationPipeline {
    acquirer: SourceAcquirer,
    templates: TemplateSet,
    backend: Arc<dyn CompletionBackend>,
    model_parameters: ModelParameters,
    parser: QuizParser,
    assembler: QuizAssembler,
    retry_policy: RetryPolicy,
}

impl GenerationPipeline {
    pub fn new(
        acquirer: SourceAcquirer,
        templates: TemplateSet,
        backend: Arc<dyn CompletionBackend>,
        model_parameters: ModelParameters,
        parser: QuizParser,
        assembler: QuizAssembler,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            acquirer,
            templates,
            backend,
            model_parameters,
            parser,
            assembler,
            retry_policy,
        }
    }

    pub async fn generate(&self, input: QuizGenerationInput) -> AppResult<GeneratedQuiz> {
        log::info!(
            "Generating quiz: type={} count={} difficulty={} user={}",
            input.question_type,
            input.count,
            input.difficulty,
            input.user_id
        );

        let source_text = self.acquirer.acquire(&input.source).await?;
        let prompt = self.templates.render(
            input.question_type,
            &source_text,
            input.count,
            input.difficulty,
        )?;

        let raw = self.complete_with_retry(&prompt).await?;
        let outcome = self.parser.parse(&raw, input.question_type, input.count)?;
        let warning = outcome.warning();
        if let Some(warning) = &warning {
            log::warn!("Quiz generation shortfall: {}", warning);
        }

        let metadata = QuizMetadata {
            title: input.title,
            topic: input.topic,
            difficulty: input.difficulty,
            tags: input.tags,
            source: input.source,
            created_by_user_id: input.user_id,
        };
        let quiz = self
            .assembler
            .assemble_and_store(outcome.questions, input.question_type, metadata)
            .await?;

        Ok(GeneratedQuiz { quiz, warning })
    }

    /// Retries the completion call alone. Non-retryable failures propagate
    /// immediately; retryable ones back off exponentially up to the bound.
    async fn complete_with_retry(&self, prompt: &str) -> AppResult<String> {
        let mut attempt = 0;
        loop {
            match self.backend.complete(prompt, &self.model_parameters).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < self.retry_policy.max_retries => {
                    let delay = self.retry_policy.delay_for(attempt);
                    attempt += 1;
                    log::warn!(
                        "Completion attempt {} failed ({}), retrying in {:?}",
                        attempt,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
