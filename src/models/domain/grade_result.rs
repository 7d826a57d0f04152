use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The computed outcome of grading one submission. Either the whole result
/// exists or none of it does; partial grades are never produced.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GradeResult {
    pub submission_id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f32,
    pub passed: bool,
    pub per_question: Vec<QuestionGrade>,
    pub graded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionGrade {
    pub question_id: String,
    /// None when the question was left unanswered (scored incorrect).
    pub selected_index: Option<u32>,
    pub correct: bool,
}

impl GradeResult {
    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.score == self.total_questions
    }
}
