use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        GradeResult, QuestionGrade, Quiz, Submission, SubmissionAnswer, UserProgress,
    },
    repositories::{QuizRepository, SubmissionRepository, UserProgressRepository},
};

/// Grades one submission against its quiz and folds the outcome into the
/// user's progress aggregate. Each request moves through Received →
/// Validated → Scored → Recorded; a failure in any phase aborts the request
/// with no partial grade.
pub struct GradingService {
    quiz_repository: Arc<dyn QuizRepository>,
    submission_repository: Arc<dyn SubmissionRepository>,
    progress_repository: Arc<dyn UserProgressRepository>,
    pass_threshold: f32,
    progress_save_retries: u32,
}

impl GradingService {
    pub fn new(
        quiz_repository: Arc<dyn QuizRepository>,
        submission_repository: Arc<dyn SubmissionRepository>,
        progress_repository: Arc<dyn UserProgressRepository>,
        pass_threshold: f32,
        progress_save_retries: u32,
    ) -> Self {
        Self {
            quiz_repository,
            submission_repository,
            progress_repository,
            pass_threshold,
            progress_save_retries,
        }
    }

    pub async fn grade(
        &self,
        user_id: &str,
        quiz_id: &str,
        answers: Vec<SubmissionAnswer>,
    ) -> AppResult<GradeResult> {
        log::info!("Grading received: user={} quiz={}", user_id, quiz_id);

        let quiz = self
            .quiz_repository
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", quiz_id)))?;

        validate_answers(&quiz, &answers)?;
        log::debug!("Grading validated: user={} quiz={}", user_id, quiz_id);

        let submission = Submission::new(user_id, quiz_id, answers);
        let result = score_submission(&quiz, &submission, self.pass_threshold);
        log::debug!(
            "Grading scored: user={} quiz={} score={}/{}",
            user_id,
            quiz_id,
            result.score,
            result.total_questions
        );

        self.submission_repository.create(submission).await?;
        let progress = self.record_progress(&result).await?;
        log::info!(
            "Grading recorded: user={} quiz={} streak={} badges={}",
            user_id,
            quiz_id,
            progress.current_streak,
            progress.badges.len()
        );

        Ok(result)
    }

    pub async fn progress(&self, user_id: &str) -> AppResult<UserProgress> {
        self.progress_repository.get_or_create(user_id).await
    }

    /// Optimistic-concurrency loop around the progress aggregate: re-read,
    /// apply, compare-and-swap save, retrying on a version conflict up to
    /// the configured bound.
    async fn record_progress(&self, result: &GradeResult) -> AppResult<UserProgress> {
        let mut attempt = 0;
        loop {
            let mut progress = self
                .progress_repository
                .get_or_create(&result.user_id)
                .await?;
            let expected_version = progress.version;

            progress.record_grade(result, Utc::now().date_naive());
            progress.version = expected_version + 1;

            match self
                .progress_repository
                .save(progress.clone(), expected_version)
                .await
            {
                Ok(()) => return Ok(progress),
                Err(AppError::VersionConflict(_)) if attempt < self.progress_save_retries => {
                    attempt += 1;
                    log::warn!(
                        "Progress version conflict for user {}, retry {}",
                        result.user_id,
                        attempt
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Validation phase: every answer must reference a question in the quiz,
/// at most once, with an index inside that question's option range. Runs
/// before any write so a rejected submission has no side effects.
pub fn validate_answers(quiz: &Quiz, answers: &[SubmissionAnswer]) -> AppResult<()> {
    let mut seen: Vec<&str> = Vec::new();

    for answer in answers {
        let question = quiz
            .questions
            .iter()
            .find(|q| q.id == answer.question_id)
            .ok_or_else(|| {
                AppError::UnknownQuestion(format!(
                    "Question '{}' is not part of quiz '{}'",
                    answer.question_id, quiz.id
                ))
            })?;

        if seen.contains(&answer.question_id.as_str()) {
            return Err(AppError::ValidationError(format!(
                "Question '{}' is answered more than once",
                answer.question_id
            )));
        }
        seen.push(&answer.question_id);

        let option_count = question.option_count();
        if answer.selected_index as usize >= option_count {
            return Err(AppError::InvalidOptionIndex {
                question_id: answer.question_id.clone(),
                selected: answer.selected_index,
                option_count: option_count as u32,
            });
        }
    }

    Ok(())
}

/// Scoring phase. Pure: identical quiz and submission always produce the
/// same result. Unanswered questions count as incorrect; correctness per
/// question is a straight index comparison regardless of question type.
pub fn score_submission(quiz: &Quiz, submission: &Submission, pass_threshold: f32) -> GradeResult {
    let answered: HashMap<&str, u32> = submission
        .answers
        .iter()
        .map(|a| (a.question_id.as_str(), a.selected_index))
        .collect();

    let per_question: Vec<QuestionGrade> = quiz
        .questions
        .iter()
        .map(|question| {
            let selected_index = answered.get(question.id.as_str()).copied();
            let correct = selected_index
                .map(|i| question.correct_indices().contains(&(i as usize)))
                .unwrap_or(false);
            QuestionGrade {
                question_id: question.id.clone(),
                selected_index,
                correct,
            }
        })
        .collect();

    let score = per_question.iter().filter(|g| g.correct).count() as u32;
    let total_questions = quiz.questions.len() as u32;
    let percentage = if total_questions > 0 {
        score as f32 / total_questions as f32
    } else {
        0.0
    };

    GradeResult {
        submission_id: submission.id.clone(),
        quiz_id: quiz.id.clone(),
        user_id: submission.user_id.clone(),
        score,
        total_questions,
        percentage,
        passed: percentage >= pass_threshold,
        per_question,
        graded_at: Utc::now(),
    }
}
