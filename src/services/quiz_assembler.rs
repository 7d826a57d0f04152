use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Difficulty, Question, QuestionType, Quiz, QuizSource},
    repositories::QuizRepository,
    services::quiz_parser::ParsedQuestion,
};

/// Caller-supplied metadata for the quiz under assembly.
#[derive(Debug, Clone)]
pub struct QuizMetadata {
    pub title: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub source: QuizSource,
    pub created_by_user_id: String,
}

/// Turns accepted parsed questions into the immutable quiz aggregate:
/// assigns identities, keeps parse order, re-runs the structural invariants
/// and persists in one atomic insert.
pub struct QuizAssembler {
    quiz_repository: Arc<dyn QuizRepository>,
}

impl QuizAssembler {
    pub fn new(quiz_repository: Arc<dyn QuizRepository>) -> Self {
        Self { quiz_repository }
    }

    pub async fn assemble_and_store(
        &self,
        parsed: Vec<ParsedQuestion>,
        question_type: QuestionType,
        metadata: QuizMetadata,
    ) -> AppResult<Quiz> {
        if parsed.is_empty() {
            return Err(AppError::EmptyQuiz);
        }

        let questions: Vec<Question> = parsed
            .into_iter()
            .enumerate()
            .map(|(order, q)| Question {
                id: Uuid::new_v4().to_string(),
                question_type,
                prompt: q.prompt,
                options: q.options,
                image_ref: q.image_ref,
                order: order as i16,
            })
            .collect();

        for question in &questions {
            question.validate()?;
        }

        let topic = metadata
            .topic
            .unwrap_or_else(|| summarize_reference(metadata.source.reference()));
        let title = metadata
            .title
            .unwrap_or_else(|| format!("Quiz: {}", topic));

        let quiz = Quiz {
            id: Uuid::new_v4().to_string(),
            title,
            topic,
            difficulty: metadata.difficulty,
            tags: metadata.tags,
            source: metadata.source,
            created_by_user_id: metadata.created_by_user_id,
            questions,
            created_at: Utc::now(),
        };

        log::info!(
            "Storing quiz {} with {} questions",
            quiz.id,
            quiz.questions.len()
        );
        self.quiz_repository.create_quiz(quiz).await
    }
}

/// Fallback topic when the caller supplies none: the first words of the
/// source reference, capped so URLs and long prompts stay readable.
fn summarize_reference(reference: &str) -> String {
    const MAX_TOPIC_CHARS: usize = 60;
    let trimmed = reference.trim();
    if trimmed.chars().count() <= MAX_TOPIC_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_TOPIC_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::QuestionOption;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingQuizRepository {
        stored: Mutex<Vec<Quiz>>,
    }

    impl RecordingQuizRepository {
        fn new() -> Self {
            Self {
                stored: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuizRepository for RecordingQuizRepository {
        async fn create_quiz(&self, quiz: Quiz) -> AppResult<Quiz> {
            self.stored.lock().unwrap().push(quiz.clone());
            Ok(quiz)
        }

        async fn find_by_id(&self, _id: &str) -> AppResult<Option<Quiz>> {
            Ok(None)
        }

        async fn list_quizzes(&self, _offset: i64, _limit: i64) -> AppResult<(Vec<Quiz>, i64)> {
            Ok((Vec::new(), 0))
        }

        async fn list_quizzes_by_user(
            &self,
            _user_id: &str,
            _offset: i64,
            _limit: i64,
        ) -> AppResult<(Vec<Quiz>, i64)> {
            Ok((Vec::new(), 0))
        }
    }

    fn parsed_question(n: usize) -> ParsedQuestion {
        ParsedQuestion {
            prompt: format!("Question {}?", n),
            options: vec![
                QuestionOption {
                    text: format!("Right {}", n),
                    correct: true,
                },
                QuestionOption {
                    text: format!("Wrong {}", n),
                    correct: false,
                },
            ],
            image_ref: None,
        }
    }

    fn metadata() -> QuizMetadata {
        QuizMetadata {
            title: None,
            topic: Some("TCP handshake".to_string()),
            difficulty: Difficulty::Medium,
            tags: vec!["networking".to_string()],
            source: QuizSource::Prompt("Explain TCP handshake".to_string()),
            created_by_user_id: "user-1".to_string(),
        }
    }

    #[actix_rt::test]
    async fn assembles_questions_in_parse_order_with_fresh_ids() {
        let repo = Arc::new(RecordingQuizRepository::new());
        let assembler = QuizAssembler::new(repo.clone());

        let quiz = assembler
            .assemble_and_store(
                (1..=3).map(parsed_question).collect(),
                QuestionType::Mcq,
                metadata(),
            )
            .await
            .expect("assembly should succeed");

        assert_eq!(quiz.questions.len(), 3);
        for (i, question) in quiz.questions.iter().enumerate() {
            assert_eq!(question.order, i as i16);
            assert_eq!(question.prompt, format!("Question {}?", i + 1));
            assert!(!question.id.is_empty());
        }
        assert_eq!(quiz.title, "Quiz: TCP handshake");
        assert_eq!(repo.stored.lock().unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn zero_questions_is_an_empty_quiz_error() {
        let assembler = QuizAssembler::new(Arc::new(RecordingQuizRepository::new()));
        let result = assembler
            .assemble_and_store(Vec::new(), QuestionType::Mcq, metadata())
            .await;

        assert!(matches!(result, Err(AppError::EmptyQuiz)));
    }

    #[actix_rt::test]
    async fn invalid_question_fails_before_persisting() {
        let repo = Arc::new(RecordingQuizRepository::new());
        let assembler = QuizAssembler::new(repo.clone());

        let mut bad = parsed_question(1);
        bad.options[0].correct = false; // no correct option left

        let result = assembler
            .assemble_and_store(vec![bad], QuestionType::Mcq, metadata())
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(repo.stored.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn long_reference_is_summarized_into_topic() {
        let repo = Arc::new(RecordingQuizRepository::new());
        let assembler = QuizAssembler::new(repo);

        let mut meta = metadata();
        meta.topic = None;
        meta.source = QuizSource::Prompt("word ".repeat(40));

        let quiz = assembler
            .assemble_and_store(vec![parsed_question(1)], QuestionType::Mcq, meta)
            .await
            .expect("assembly should succeed");

        assert!(quiz.topic.chars().count() <= 61);
    }
}
