use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz::{Difficulty, QuizSource};
use crate::models::domain::question::QuestionType;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[validate(nested)]
    pub source: SourceInput,

    pub question_type: QuestionType,

    #[validate(range(min = 1, max = 50))]
    pub count: u32,

    #[serde(default)]
    pub difficulty: Option<Difficulty>,

    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub topic: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SourceInput {
    pub kind: SourceKind,

    #[validate(length(min = 1, max = 4000))]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Prompt,
    Url,
}

impl SourceInput {
    pub fn to_domain(&self) -> AppResult<QuizSource> {
        match self.kind {
            SourceKind::Prompt => Ok(QuizSource::Prompt(self.value.trim().to_string())),
            SourceKind::Url => {
                let url = self.value.trim();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(AppError::ValidationError(format!(
                        "Source URL must be http(s), got '{}'",
                        url
                    )));
                }
                Ok(QuizSource::Url(url.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    #[validate(length(min = 1, message = "Submission must contain at least one answer"))]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerInput {
    pub question_id: String,
    pub selected_index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionHistoryQuery {
    pub quiz_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_validates_count_range() {
        let request = GenerateQuizRequest {
            source: SourceInput {
                kind: SourceKind::Prompt,
                value: "Explain TCP handshake".to_string(),
            },
            question_type: QuestionType::Mcq,
            count: 0,
            difficulty: None,
            title: None,
            topic: None,
            tags: vec![],
        };
        assert!(request.validate().is_err());

        let request = GenerateQuizRequest {
            count: 5,
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn url_source_requires_http_scheme() {
        let input = SourceInput {
            kind: SourceKind::Url,
            value: "ftp://example.com/file".to_string(),
        };
        assert!(matches!(
            input.to_domain(),
            Err(AppError::ValidationError(_))
        ));

        let input = SourceInput {
            kind: SourceKind::Url,
            value: "https://example.com/article".to_string(),
        };
        assert!(matches!(input.to_domain(), Ok(QuizSource::Url(_))));
    }

    #[test]
    fn prompt_source_is_trimmed() {
        let input = SourceInput {
            kind: SourceKind::Prompt,
            value: "  Explain TCP  ".to_string(),
        };
        match input.to_domain().unwrap() {
            QuizSource::Prompt(text) => assert_eq!(text, "Explain TCP"),
            other => panic!("expected prompt source, got {:?}", other),
        }
    }

    #[test]
    fn submit_request_rejects_empty_answer_list() {
        let request = SubmitAnswersRequest { answers: vec![] };
        assert!(request.validate().is_err());
    }
}
