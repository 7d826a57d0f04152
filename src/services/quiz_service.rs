use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Quiz, Submission},
    repositories::{QuizRepository, SubmissionRepository},
};

/// Read-side operations over stored quizzes and submissions.
pub struct QuizService {
    quiz_repository: Arc<dyn QuizRepository>,
    submission_repository: Arc<dyn SubmissionRepository>,
}

impl QuizService {
    pub fn new(
        quiz_repository: Arc<dyn QuizRepository>,
        submission_repository: Arc<dyn SubmissionRepository>,
    ) -> Self {
        Self {
            quiz_repository,
            submission_repository,
        }
    }

    pub async fn get_quiz(&self, id: &str) -> AppResult<Quiz> {
        self.quiz_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", id)))
    }

    pub async fn list_quizzes(&self, offset: i64, limit: i64) -> AppResult<(Vec<Quiz>, i64)> {
        self.quiz_repository.list_quizzes(offset, limit).await
    }

    pub async fn list_quizzes_by_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Quiz>, i64)> {
        self.quiz_repository
            .list_quizzes_by_user(user_id, offset, limit)
            .await
    }

    pub async fn submission_history(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> AppResult<Vec<Submission>> {
        self.submission_repository
            .find_by_user(user_id, quiz_id)
            .await
    }
}
