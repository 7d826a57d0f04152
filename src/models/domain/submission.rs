use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's recorded answers to a quiz. References the quiz and its questions
/// by identity only; re-submitting creates a new document so history is kept.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub answers: Vec<SubmissionAnswer>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubmissionAnswer {
    pub question_id: String,
    pub selected_index: u32,
}

impl Submission {
    pub fn new(user_id: &str, quiz_id: &str, answers: Vec<SubmissionAnswer>) -> Self {
        Submission {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            quiz_id: quiz_id.to_string(),
            answers,
            submitted_at: Utc::now(),
        }
    }
}
