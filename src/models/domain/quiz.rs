use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::question::Question;

/// An immutable quiz aggregate. Questions are embedded so a quiz and its
/// children persist in one atomic insert; regeneration creates a new quiz
/// rather than editing this one in place.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub source: QuizSource,
    pub created_by_user_id: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

/// Where the quiz content came from: a literal user prompt or a scraped URL.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QuizSource {
    Prompt(String),
    Url(String),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl QuizSource {
    pub fn reference(&self) -> &str {
        match self {
            QuizSource::Prompt(text) => text,
            QuizSource::Url(url) => url,
        }
    }
}
