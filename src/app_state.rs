use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoQuizRepository, MongoSubmissionRepository, MongoUserProgressRepository,
    },
    services::{
        completion_client::{ModelParameters, OpenAiCompletionClient},
        generation_pipeline::{GenerationPipeline, RetryPolicy},
        grading_service::GradingService,
        prompt_templater::TemplateSet,
        quiz_assembler::QuizAssembler,
        quiz_parser::QuizParser,
        quiz_service::QuizService,
        source_acquirer::{HttpSourceFetcher, SourceAcquirer},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub generation_pipeline: Arc<GenerationPipeline>,
    pub grading_service: Arc<GradingService>,
    pub quiz_service: Arc<QuizService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Arc::new(Database::connect(&config).await?);

        let quiz_repository = Arc::new(MongoQuizRepository::new(&db));
        quiz_repository.ensure_indexes().await?;

        let submission_repository = Arc::new(MongoSubmissionRepository::new(&db));
        submission_repository.ensure_indexes().await?;

        let progress_repository = Arc::new(MongoUserProgressRepository::new(&db));
        progress_repository.ensure_indexes().await?;

        let templates = TemplateSet::builtin();
        templates.validate()?;

        let fetcher = Arc::new(HttpSourceFetcher::new(config.fetch_timeout_secs)?);
        let acquirer = SourceAcquirer::new(
            fetcher,
            config.min_source_chars,
            config.max_source_chars,
            config.max_prompt_chars,
        );

        let backend = Arc::new(OpenAiCompletionClient::new(&config));
        let generation_pipeline = Arc::new(GenerationPipeline::new(
            acquirer,
            templates,
            backend,
            ModelParameters::from_config(&config),
            QuizParser::new(config.parse_accept_threshold),
            QuizAssembler::new(quiz_repository.clone()),
            RetryPolicy::from_config(&config),
        ));

        let grading_service = Arc::new(GradingService::new(
            quiz_repository.clone(),
            submission_repository.clone(),
            progress_repository,
            config.pass_threshold,
            config.progress_save_retries,
        ));

        let quiz_service = Arc::new(QuizService::new(quiz_repository, submission_repository));

        Ok(Self {
            db,
            generation_pipeline,
            grading_service,
            quiz_service,
            config: Arc::new(config),
        })
    }
}
