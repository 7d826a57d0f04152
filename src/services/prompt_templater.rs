use std::collections::HashMap;

use crate::{
    constants::templates::{IMAGE_TEMPLATE, MCQ_TEMPLATE, TRUE_FALSE_TEMPLATE},
    errors::{AppError, AppResult},
    models::domain::{Difficulty, QuestionType},
};

const PLACEHOLDERS: [&str; 3] = ["{source_text}", "{count}", "{difficulty}"];

/// Read-only template set keyed by question type, loaded once at startup.
/// A missing or malformed template is a configuration error surfaced by
/// `validate()`, never a per-request failure.
pub struct TemplateSet {
    templates: HashMap<QuestionType, String>,
}

impl TemplateSet {
    /// The built-in templates from `constants/templates.rs`.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(QuestionType::Mcq, MCQ_TEMPLATE.to_string());
        templates.insert(QuestionType::TrueFalse, TRUE_FALSE_TEMPLATE.to_string());
        templates.insert(QuestionType::Image, IMAGE_TEMPLATE.to_string());
        Self { templates }
    }

    pub fn with_template(mut self, question_type: QuestionType, template: &str) -> Self {
        self.templates.insert(question_type, template.to_string());
        self
    }

    /// Startup check: every question type has a template and every template
    /// carries all required placeholders.
    pub fn validate(&self) -> AppResult<()> {
        for question_type in [QuestionType::Mcq, QuestionType::TrueFalse, QuestionType::Image] {
            let template = self.templates.get(&question_type).ok_or_else(|| {
                AppError::Configuration(format!(
                    "No prompt template configured for question type '{}'",
                    question_type
                ))
            })?;

            for placeholder in PLACEHOLDERS {
                if !template.contains(placeholder) {
                    return Err(AppError::Configuration(format!(
                        "Template for '{}' is missing placeholder {}",
                        question_type, placeholder
                    )));
                }
            }
        }
        Ok(())
    }

    /// Deterministic placeholder substitution; no randomness is introduced
    /// here, so identical inputs always produce identical prompts.
    pub fn render(
        &self,
        question_type: QuestionType,
        source_text: &str,
        count: u32,
        difficulty: Difficulty,
    ) -> AppResult<String> {
        if source_text.trim().is_empty() {
            return Err(AppError::TemplateRender(
                "Source text is empty; nothing to fill {source_text} with".into(),
            ));
        }

        let template = self.templates.get(&question_type).ok_or_else(|| {
            AppError::Configuration(format!(
                "No prompt template configured for question type '{}'",
                question_type
            ))
        })?;

        let rendered = template
            .replace("{source_text}", source_text.trim())
            .replace("{count}", &count.to_string())
            .replace("{difficulty}", &difficulty.to_string());

        // A surviving placeholder means the substitution went wrong.
        for placeholder in PLACEHOLDERS {
            if rendered.contains(placeholder) {
                return Err(AppError::TemplateRender(format!(
                    "Placeholder {} was not filled",
                    placeholder
                )));
            }
        }

        Ok(rendered)
    }
}
