use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use smart_quiz_server::{
    errors::{AppError, AppResult},
    models::domain::{Difficulty, QuestionType, Quiz, QuizSource},
    repositories::QuizRepository,
    services::{
        completion_client::{CompletionBackend, ModelParameters},
        generation_pipeline::{GenerationPipeline, QuizGenerationInput, RetryPolicy},
        prompt_templater::TemplateSet,
        quiz_assembler::QuizAssembler,
        quiz_parser::QuizParser,
        source_acquirer::{FetchedContent, SourceAcquirer, SourceFetcher},
    },
};

struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    fn new() -> Self {
        Self {
            quizzes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn count(&self) -> usize {
        self.quizzes.read().await.len()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create_quiz(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.quizzes
            .write()
            .await
            .insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn list_quizzes(&self, _offset: i64, _limit: i64) -> AppResult<(Vec<Quiz>, i64)> {
        let quizzes = self.quizzes.read().await;
        let items: Vec<_> = quizzes.values().cloned().collect();
        let total = items.len() as i64;
        Ok((items, total))
    }

    async fn list_quizzes_by_user(
        &self,
        user_id: &str,
        _offset: i64,
        _limit: i64,
    ) -> AppResult<(Vec<Quiz>, i64)> {
        let quizzes = self.quizzes.read().await;
        let items: Vec<_> = quizzes
            .values()
            .filter(|q| q.created_by_user_id == user_id)
            .cloned()
            .collect();
        let total = items.len() as i64;
        Ok((items, total))
    }
}

/// Fetcher that always returns the same scripted response and counts calls.
struct ScriptedFetcher {
    response: AppResult<FetchedContent>,
    calls: AtomicU32,
}

impl ScriptedFetcher {
    fn ok(content_type: &str, body: &str) -> Self {
        Self {
            response: Ok(FetchedContent {
                content_type: content_type.to_string(),
                body: body.to_string(),
            }),
            calls: AtomicU32::new(0),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            response: Err(AppError::Fetch(message.to_string())),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str) -> AppResult<FetchedContent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Backend that plays back a scripted sequence of results, one per call,
/// repeating the last one if called again.
struct ScriptedBackend {
    script: Vec<AppResult<String>>,
    calls: AtomicU32,
}

impl ScriptedBackend {
    fn new(script: Vec<AppResult<String>>) -> Self {
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }

    fn returning(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _prompt: &str, _params: &ModelParameters) -> AppResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let index = call.min(self.script.len().saturating_sub(1));
        self.script[index].clone()
    }
}

fn mcq_blocks(valid: u32, broken: u32) -> String {
    let mut raw = String::new();
    let mut n = 0;
    for _ in 0..valid {
        n += 1;
        raw.push_str(&format!(
            "{n}. What does question {n} ask?\n\
             A. First option {n}\n\
             B. Second option {n}\n\
             C. Third option {n}\n\
             D. Fourth option {n}\n\
             Answer: B\n"
        ));
    }
    for _ in 0..broken {
        n += 1;
        raw.push_str(&format!("{n}. Broken question {n}\nA. Yes\nB. No\n"));
    }
    raw
}

struct Harness {
    pipeline: GenerationPipeline,
    quizzes: Arc<InMemoryQuizRepository>,
    fetcher: Arc<ScriptedFetcher>,
    backend: Arc<ScriptedBackend>,
}

fn harness(fetcher: ScriptedFetcher, backend: ScriptedBackend, threshold: f32) -> Harness {
    let quizzes = Arc::new(InMemoryQuizRepository::new());
    let fetcher = Arc::new(fetcher);
    let backend = Arc::new(backend);

    let acquirer = SourceAcquirer::new(fetcher.clone(), 20, 2000, 500);
    let pipeline = GenerationPipeline::new(
        acquirer,
        TemplateSet::builtin(),
        backend.clone(),
        ModelParameters {
            model_id: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 700,
        },
        QuizParser::new(threshold),
        QuizAssembler::new(quizzes.clone()),
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        },
    );

    Harness {
        pipeline,
        quizzes,
        fetcher,
        backend,
    }
}

fn prompt_input(count: u32) -> QuizGenerationInput {
    QuizGenerationInput {
        source: QuizSource::Prompt("Explain the TCP handshake".to_string()),
        question_type: QuestionType::Mcq,
        count,
        difficulty: Difficulty::Medium,
        title: None,
        topic: Some("TCP handshake".to_string()),
        tags: vec![],
        user_id: "user-1".to_string(),
    }
}

#[actix_rt::test]
async fn prompt_to_stored_quiz_happy_path() {
    let h = harness(
        ScriptedFetcher::failing("unused"),
        ScriptedBackend::returning(&mcq_blocks(5, 0)),
        0.5,
    );

    let generated = h
        .pipeline
        .generate(prompt_input(5))
        .await
        .expect("generation should succeed");

    assert_eq!(generated.quiz.questions.len(), 5);
    assert_eq!(generated.quiz.difficulty, Difficulty::Medium);
    assert!(generated.quiz.tags.is_empty());
    assert!(generated.warning.is_none());
    for (i, question) in generated.quiz.questions.iter().enumerate() {
        assert_eq!(question.order, i as i16);
        assert_eq!(question.correct_indices(), vec![1]);
    }

    // Prompt sources never touch the network.
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(h.quizzes.count().await, 1);
}

#[actix_rt::test]
async fn fetch_failure_short_circuits_before_completion() {
    let h = harness(
        ScriptedFetcher::failing("GET https://example.com/article returned 404"),
        ScriptedBackend::returning(&mcq_blocks(5, 0)),
        0.5,
    );

    let mut input = prompt_input(5);
    input.source = QuizSource::Url("https://example.com/article".to_string());

    let result = h.pipeline.generate(input).await;
    assert!(matches!(result, Err(AppError::Fetch(_))));
    assert_eq!(h.backend.call_count(), 0);
    assert_eq!(h.quizzes.count().await, 0);
}

#[actix_rt::test]
async fn url_source_is_scraped_and_used() {
    let article = format!(
        "<html><body><p>{}</p></body></html>",
        "TCP is a reliable transport protocol. ".repeat(5)
    );
    let h = harness(
        ScriptedFetcher::ok("text/html", &article),
        ScriptedBackend::returning(&mcq_blocks(3, 0)),
        0.5,
    );

    let mut input = prompt_input(3);
    input.source = QuizSource::Url("https://example.com/tcp".to_string());

    let generated = h
        .pipeline
        .generate(input)
        .await
        .expect("generation should succeed");
    assert_eq!(generated.quiz.questions.len(), 3);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(matches!(generated.quiz.source, QuizSource::Url(_)));
}

#[actix_rt::test]
async fn insufficient_valid_questions_store_nothing() {
    let h = harness(
        ScriptedFetcher::failing("unused"),
        ScriptedBackend::returning(&mcq_blocks(3, 7)),
        0.5,
    );

    let result = h.pipeline.generate(prompt_input(10)).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientValidQuestions {
            accepted: 3,
            requested: 10
        })
    ));
    assert_eq!(h.quizzes.count().await, 0);
}

#[actix_rt::test]
async fn shortfall_above_threshold_yields_warning() {
    let h = harness(
        ScriptedFetcher::failing("unused"),
        ScriptedBackend::returning(&mcq_blocks(6, 4)),
        0.5,
    );

    let generated = h
        .pipeline
        .generate(prompt_input(10))
        .await
        .expect("6/10 clears a 0.5 threshold");

    assert_eq!(generated.quiz.questions.len(), 6);
    let warning = generated.warning.expect("shortfall must be reported");
    assert!(warning.contains("10"));
    assert!(warning.contains("6"));
}

#[actix_rt::test]
async fn retryable_completion_failure_is_retried_then_succeeds() {
    let h = harness(
        ScriptedFetcher::failing("unused"),
        ScriptedBackend::new(vec![
            Err(AppError::CompletionService {
                message: "upstream timeout".to_string(),
                retryable: true,
            }),
            Ok(mcq_blocks(5, 0)),
        ]),
        0.5,
    );

    let generated = h
        .pipeline
        .generate(prompt_input(5))
        .await
        .expect("second attempt succeeds");

    assert_eq!(generated.quiz.questions.len(), 5);
    assert_eq!(h.backend.call_count(), 2);
}

#[actix_rt::test]
async fn non_retryable_completion_failure_is_not_retried() {
    let h = harness(
        ScriptedFetcher::failing("unused"),
        ScriptedBackend::new(vec![Err(AppError::CompletionService {
            message: "model rejected the request".to_string(),
            retryable: false,
        })]),
        0.5,
    );

    let result = h.pipeline.generate(prompt_input(5)).await;
    assert!(matches!(
        result,
        Err(AppError::CompletionService {
            retryable: false,
            ..
        })
    ));
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(h.quizzes.count().await, 0);
}

#[actix_rt::test]
async fn retry_bound_is_respected() {
    let h = harness(
        ScriptedFetcher::failing("unused"),
        ScriptedBackend::new(vec![Err(AppError::CompletionService {
            message: "upstream unavailable".to_string(),
            retryable: true,
        })]),
        0.5,
    );

    let result = h.pipeline.generate(prompt_input(5)).await;
    assert!(matches!(
        result,
        Err(AppError::CompletionService { retryable: true, .. })
    ));
    // One initial attempt plus two retries.
    assert_eq!(h.backend.call_count(), 3);
}
