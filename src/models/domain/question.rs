use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    /// Reference to the image the question is about (`Image` questions only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub order: i16,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionOption {
    pub text: String,
    pub correct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    Image,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Image => "image",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Question {
    /// Indices of options marked correct, in option order.
    pub fn correct_indices(&self) -> Vec<usize> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, opt)| opt.correct)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Enforce the structural invariants every persisted question must hold.
    /// Called by the assembler as the last line of defense; parser output
    /// that fails here is a bug in the parser's own validation.
    pub fn validate(&self) -> AppResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "Question '{}' has an empty prompt",
                self.id
            )));
        }

        let count = self.option_count();
        match self.question_type {
            QuestionType::TrueFalse => {
                if count != 2 {
                    return Err(AppError::ValidationError(format!(
                        "True/false question '{}' must have exactly 2 options, has {}",
                        self.id, count
                    )));
                }
            }
            QuestionType::Mcq | QuestionType::Image => {
                if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
                    return Err(AppError::ValidationError(format!(
                        "Question '{}' must have {}-{} options, has {}",
                        self.id, MIN_OPTIONS, MAX_OPTIONS, count
                    )));
                }
            }
        }

        if self.question_type == QuestionType::Image && self.image_ref.is_none() {
            return Err(AppError::ValidationError(format!(
                "Image question '{}' is missing its image reference",
                self.id
            )));
        }

        if self.correct_indices().len() != 1 {
            return Err(AppError::ValidationError(format!(
                "Question '{}' must have exactly one correct option",
                self.id
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for opt in &self.options {
            let text = opt.text.trim();
            if text.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "Question '{}' has an empty option",
                    self.id
                )));
            }
            if !seen.insert(text.to_lowercase()) {
                return Err(AppError::ValidationError(format!(
                    "Question '{}' has duplicate option '{}'",
                    self.id, text
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(text: &str, correct: bool) -> QuestionOption {
        QuestionOption {
            text: text.to_string(),
            correct,
        }
    }

    fn mcq(options: Vec<QuestionOption>) -> Question {
        Question {
            id: "q-1".to_string(),
            question_type: QuestionType::Mcq,
            prompt: "Which layer does TCP live in?".to_string(),
            options,
            image_ref: None,
            order: 0,
        }
    }

    #[test]
    fn question_type_round_trip_serialization() {
        let variants = [
            QuestionType::Mcq,
            QuestionType::TrueFalse,
            QuestionType::Image,
        ];

        for variant in variants {
            let json = serde_json::to_string(&variant).expect("variant should serialize");
            let parsed: QuestionType =
                serde_json::from_str(&json).expect("variant should deserialize");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn question_type_rejects_unknown_variant() {
        let parsed = serde_json::from_str::<QuestionType>("\"essay\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn valid_mcq_passes_validation() {
        let question = mcq(vec![
            option("Transport", true),
            option("Network", false),
            option("Session", false),
            option("Physical", false),
        ]);

        assert!(question.validate().is_ok());
        assert_eq!(question.correct_indices(), vec![0]);
        assert_eq!(question.option_count(), 4);
    }

    #[test]
    fn mcq_with_two_correct_options_fails_closed() {
        let question = mcq(vec![
            option("Transport", true),
            option("Network", true),
            option("Session", false),
        ]);

        assert!(matches!(
            question.validate(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn mcq_with_no_correct_option_fails_closed() {
        let question = mcq(vec![option("Transport", false), option("Network", false)]);
        assert!(question.validate().is_err());
    }

    #[test]
    fn mcq_option_count_bounds() {
        let too_few = mcq(vec![option("Only one", true)]);
        assert!(too_few.validate().is_err());

        let mut options: Vec<QuestionOption> =
            (0..7).map(|i| option(&format!("opt {}", i), false)).collect();
        options[0].correct = true;
        let too_many = mcq(options);
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn duplicate_options_rejected_case_insensitively() {
        let question = mcq(vec![
            option("Transport", true),
            option("transport", false),
            option("Network", false),
        ]);
        assert!(question.validate().is_err());
    }

    #[test]
    fn true_false_requires_exactly_two_options() {
        let mut question = mcq(vec![
            option("True", true),
            option("False", false),
            option("Maybe", false),
        ]);
        question.question_type = QuestionType::TrueFalse;
        assert!(question.validate().is_err());

        question.options.pop();
        assert!(question.validate().is_ok());
    }

    #[test]
    fn image_question_requires_image_ref() {
        let mut question = mcq(vec![option("Left region", true), option("Right region", false)]);
        question.question_type = QuestionType::Image;
        assert!(question.validate().is_err());

        question.image_ref = Some("https://example.com/diagram.png".to_string());
        assert!(question.validate().is_ok());
    }
}
