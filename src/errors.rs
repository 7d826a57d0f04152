use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("Extracted content too short: {length} chars (minimum {minimum})")]
    ContentTooShort { length: usize, minimum: usize },

    #[error("Template render failed: {0}")]
    TemplateRender(String),

    #[error("Completion service failure: {message}")]
    CompletionService { message: String, retryable: bool },

    #[error("Only {accepted} of {requested} requested questions parsed validly")]
    InsufficientValidQuestions { accepted: usize, requested: usize },

    #[error("No questions survived validation; refusing to create an empty quiz")]
    EmptyQuiz,

    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("Option index {selected} out of range for question '{question_id}' with {option_count} options")]
    InvalidOptionIndex {
        question_id: String,
        selected: u32,
        option_count: u32,
    },

    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidPrompt(_) => "INVALID_PROMPT",
            AppError::Fetch(_) => "FETCH_ERROR",
            AppError::UnsupportedContent(_) => "UNSUPPORTED_CONTENT",
            AppError::ContentTooShort { .. } => "CONTENT_TOO_SHORT",
            AppError::TemplateRender(_) => "TEMPLATE_RENDER_ERROR",
            AppError::CompletionService { .. } => "COMPLETION_SERVICE_ERROR",
            AppError::InsufficientValidQuestions { .. } => "INSUFFICIENT_VALID_QUESTIONS",
            AppError::EmptyQuiz => "EMPTY_QUIZ",
            AppError::UnknownQuestion(_) => "UNKNOWN_QUESTION",
            AppError::InvalidOptionIndex { .. } => "INVALID_OPTION_INDEX",
            AppError::VersionConflict(_) => "VERSION_CONFLICT",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller (pipeline or HTTP client) may usefully retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::CompletionService { retryable, .. } => *retryable,
            AppError::Fetch(_) | AppError::VersionConflict(_) | AppError::DatabaseError(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: &'static str,
    pub code: u16,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_)
            | AppError::InvalidPrompt(_)
            | AppError::InvalidOptionIndex { .. } => StatusCode::BAD_REQUEST,
            AppError::UnsupportedContent(_)
            | AppError::ContentTooShort { .. }
            | AppError::EmptyQuiz
            | AppError::UnknownQuestion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Fetch(_)
            | AppError::CompletionService { .. }
            | AppError::InsufficientValidQuestions { .. } => StatusCode::BAD_GATEWAY,
            AppError::VersionConflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::TemplateRender(_)
            | AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            error_code: self.error_code(),
            code: self.status_code().as_u16(),
            retryable: self.is_retryable(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}
impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Fetch(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
