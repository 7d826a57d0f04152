use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::domain::{
    Badge, Difficulty, GradeResult, Question, QuestionType, Quiz, QuizSource, Submission,
    UserProgress,
};

/// Client view of a quiz. Options are exposed as plain text only; the
/// `correct` flags never leave the server before grading.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub source: QuizSource,
    pub question_count: usize,
    pub questions: Vec<QuestionView>,
    pub created_at: DateTime<Utc>,
    /// Present when fewer questions than requested survived validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub order: i16,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        QuestionView {
            id: question.id.clone(),
            question_type: question.question_type,
            prompt: question.prompt.clone(),
            options: question.options.iter().map(|o| o.text.clone()).collect(),
            image_ref: question.image_ref.clone(),
            order: question.order,
        }
    }
}

impl From<Quiz> for QuizResponse {
    fn from(quiz: Quiz) -> Self {
        QuizResponse {
            question_count: quiz.questions.len(),
            questions: quiz.questions.iter().map(QuestionView::from).collect(),
            id: quiz.id,
            title: quiz.title,
            topic: quiz.topic,
            difficulty: quiz.difficulty,
            tags: quiz.tags,
            source: quiz.source,
            created_at: quiz.created_at,
            warning: None,
        }
    }
}

impl QuizResponse {
    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizListResponse {
    pub items: Vec<QuizResponse>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeResultResponse {
    pub submission_id: String,
    pub quiz_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f32,
    pub passed: bool,
    pub per_question: Vec<QuestionGradeView>,
    pub graded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionGradeView {
    pub question_id: String,
    pub selected_index: Option<u32>,
    pub correct: bool,
}

impl From<GradeResult> for GradeResultResponse {
    fn from(result: GradeResult) -> Self {
        GradeResultResponse {
            submission_id: result.submission_id,
            quiz_id: result.quiz_id,
            score: result.score,
            total_questions: result.total_questions,
            percentage: result.percentage,
            passed: result.passed,
            per_question: result
                .per_question
                .into_iter()
                .map(|g| QuestionGradeView {
                    question_id: g.question_id,
                    selected_index: g.selected_index,
                    correct: g.correct,
                })
                .collect(),
            graded_at: result.graded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    pub user_id: String,
    pub questions_attempted: i64,
    pub questions_correct: i64,
    pub quizzes_graded: i64,
    pub quizzes_passed: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_graded_on: Option<NaiveDate>,
    pub badges: Vec<Badge>,
}

impl From<UserProgress> for ProgressResponse {
    fn from(progress: UserProgress) -> Self {
        ProgressResponse {
            user_id: progress.user_id,
            questions_attempted: progress.questions_attempted,
            questions_correct: progress.questions_correct,
            quizzes_graded: progress.quizzes_graded,
            quizzes_passed: progress.quizzes_passed,
            current_streak: progress.current_streak,
            longest_streak: progress.longest_streak,
            last_graded_on: progress.last_graded_on,
            badges: progress.badges,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub id: String,
    pub quiz_id: String,
    pub answer_count: usize,
    pub submitted_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        SubmissionView {
            id: submission.id,
            quiz_id: submission.quiz_id,
            answer_count: submission.answers.len(),
            submitted_at: submission.submitted_at,
        }
    }
}
