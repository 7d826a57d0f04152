//! Tolerant parser for raw completion output. The model is asked for the
//! format defined in `constants/templates.rs` (numbered questions, lettered
//! options, an `Answer:` line) but routinely deviates, so every segment is
//! parsed to a `Result` and defects are collected instead of aborting the
//! whole parse. Validation fails closed: a segment that cannot be resolved
//! to exactly one correct option is dropped, never guessed at.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{QuestionOption, QuestionType, MAX_OPTIONS, MIN_OPTIONS},
};

/// A question as extracted from one segment of completion text, before the
/// assembler gives it an identity and a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuestion {
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    pub image_ref: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseDefect {
    #[error("segment has no question text")]
    MissingPrompt,
    #[error("segment has no recognizable options")]
    NoOptions,
    #[error("no option is marked correct")]
    NoCorrectMarker,
    #[error("{0} options are marked correct, expected exactly one")]
    MultipleCorrectMarkers(usize),
    #[error("answer letter '{0}' does not match any option")]
    AnswerOutOfRange(char),
    #[error("{found} options, expected between {min} and {max}")]
    OptionCountOutOfRange {
        found: usize,
        min: usize,
        max: usize,
    },
    #[error("option {0} is empty")]
    EmptyOption(usize),
    #[error("duplicate option text '{0}'")]
    DuplicateOption(String),
    #[error("image question has no Image: line")]
    MissingImageRef,
    #[error("true/false question must have exactly 2 options, found {0}")]
    NotBinary(usize),
}

/// One rejected segment, kept for logging and the shortfall warning.
#[derive(Debug)]
pub struct RejectedSegment {
    pub segment: usize,
    pub defect: ParseDefect,
}

/// The accepted subset plus the bookkeeping needed to report a shortfall.
#[derive(Debug)]
pub struct ParseOutcome {
    pub questions: Vec<ParsedQuestion>,
    pub requested: u32,
    pub rejected: Vec<RejectedSegment>,
}

impl ParseOutcome {
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.questions.len() as u32)
    }

    pub fn warning(&self) -> Option<String> {
        (self.shortfall() > 0).then(|| {
            format!(
                "Requested {} questions but only {} were usable",
                self.requested,
                self.questions.len()
            )
        })
    }
}

static QUESTION_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*(?:q(?:uestion)?\s*)?\d+\s*[.):]\s*").expect("boundary pattern is valid")
});
static OPTION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\*)?\s*([a-f])[.)]\s*(.+?)\s*$").expect("option pattern is valid")
});
static ANSWER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:correct\s+)?answer\s*[:\-]\s*\(?([a-f]|true|false)\)?")
        .expect("answer pattern is valid")
});
static IMAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*image\s*:\s*(\S+)").expect("image pattern is valid"));
static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("blank-line pattern is valid"));

pub struct QuizParser {
    accept_threshold: f32,
}

impl QuizParser {
    pub fn new(accept_threshold: f32) -> Self {
        Self { accept_threshold }
    }

    /// Parse raw completion text into validated questions. Applies the
    /// partial-tolerance policy: defective segments are dropped and counted,
    /// and the parse only fails wholesale when the accepted fraction of the
    /// requested count falls below the configured threshold.
    pub fn parse(
        &self,
        raw: &str,
        question_type: QuestionType,
        requested: u32,
    ) -> AppResult<ParseOutcome> {
        let mut questions = Vec::new();
        let mut rejected = Vec::new();

        for (index, segment) in split_segments(raw).iter().enumerate() {
            match parse_segment(segment, question_type) {
                Ok(question) => questions.push(question),
                Err(defect) => {
                    log::warn!("Dropping segment {}: {}", index + 1, defect);
                    rejected.push(RejectedSegment {
                        segment: index + 1,
                        defect,
                    });
                }
            }
        }

        let accepted = questions.len() as f32;
        if requested > 0 && accepted / (requested as f32) < self.accept_threshold {
            return Err(AppError::InsufficientValidQuestions {
                accepted: questions.len(),
                requested: requested as usize,
            });
        }

        Ok(ParseOutcome {
            questions,
            requested,
            rejected,
        })
    }
}

/// Split raw text into per-question segments. Numbered boundaries (`1.`,
/// `2)`, `Q3:`, `Question 4.`) take precedence; text without any numbering
/// falls back to blank-line separation.
fn split_segments(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let boundaries: Vec<_> = QUESTION_BOUNDARY.find_iter(&cleaned).collect();
    if !boundaries.is_empty() {
        return boundaries
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let end = boundaries
                    .get(i + 1)
                    .map(|next| next.start())
                    .unwrap_or(cleaned.len());
                cleaned[m.end()..end].trim().to_string()
            })
            .filter(|segment| !segment.is_empty())
            .collect();
    }

    BLANK_LINES
        .split(&cleaned)
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn parse_segment(segment: &str, question_type: QuestionType) -> Result<ParsedQuestion, ParseDefect> {
    let mut prompt_lines: Vec<&str> = Vec::new();
    let mut options: Vec<String> = Vec::new();
    let mut inline_correct: Vec<usize> = Vec::new();
    let mut answer_token: Option<String> = None;
    let mut image_ref: Option<String> = None;

    for line in segment.lines() {
        if let Some(caps) = ANSWER_LINE.captures(line) {
            answer_token = Some(caps[1].to_ascii_uppercase());
            continue;
        }
        if let Some(caps) = IMAGE_LINE.captures(line) {
            image_ref = Some(caps[1].to_string());
            continue;
        }
        if let Some(caps) = OPTION_LINE.captures(line) {
            let starred = caps.get(1).is_some();
            let mut text = caps[3].trim().to_string();

            let lowered = text.to_ascii_lowercase();
            let marked = starred
                || lowered.ends_with("(correct)")
                || lowered.ends_with('*');
            if let Some(stripped) = strip_correct_suffix(&text) {
                text = stripped;
            }

            if marked {
                inline_correct.push(options.len());
            }
            options.push(text);
            continue;
        }
        if options.is_empty() {
            prompt_lines.push(line.trim());
        }
    }

    // A true/false statement with a bare "Answer: True" line is common
    // enough to deserve recovery: synthesize the canonical option pair.
    if question_type == QuestionType::TrueFalse && options.is_empty() {
        if let Some(token) = &answer_token {
            if token == "TRUE" || token == "FALSE" {
                options = vec!["True".to_string(), "False".to_string()];
            }
        }
    }

    let prompt = prompt_lines.join(" ").trim().to_string();
    if prompt.is_empty() {
        return Err(ParseDefect::MissingPrompt);
    }
    if options.is_empty() {
        return Err(ParseDefect::NoOptions);
    }

    let correct = resolve_correct(&options, &inline_correct, answer_token.as_deref())?;
    validate_shape(&options, question_type, image_ref.as_deref())?;

    let options = options
        .into_iter()
        .enumerate()
        .map(|(i, text)| QuestionOption {
            text,
            correct: i == correct,
        })
        .collect();

    Ok(ParsedQuestion {
        prompt,
        options,
        image_ref: if question_type == QuestionType::Image {
            image_ref
        } else {
            None
        },
    })
}

fn strip_correct_suffix(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    let lowered = trimmed.to_ascii_lowercase();
    if let Some(stripped) = lowered
        .strip_suffix("(correct)")
        .map(|s| trimmed[..s.len()].trim_end().to_string())
    {
        return Some(stripped);
    }
    trimmed
        .strip_suffix('*')
        .map(|s| s.trim_end().to_string())
}

/// Resolve the single correct option from inline markers and the answer
/// line. Agreement between the two is fine; any ambiguity is a defect.
fn resolve_correct(
    options: &[String],
    inline: &[usize],
    answer_token: Option<&str>,
) -> Result<usize, ParseDefect> {
    let mut correct: Vec<usize> = inline.to_vec();

    if let Some(token) = answer_token {
        let index = match token {
            "TRUE" => find_option(options, "true"),
            "FALSE" => find_option(options, "false"),
            letter => {
                let ch = letter.chars().next().unwrap_or('?');
                let index = (ch as usize).wrapping_sub('A' as usize);
                if index >= options.len() {
                    return Err(ParseDefect::AnswerOutOfRange(ch));
                }
                Some(index)
            }
        };
        match index {
            Some(i) if !correct.contains(&i) => correct.push(i),
            Some(_) => {}
            None => return Err(ParseDefect::AnswerOutOfRange('?')),
        }
    }

    match correct.len() {
        0 => Err(ParseDefect::NoCorrectMarker),
        1 => Ok(correct[0]),
        n => Err(ParseDefect::MultipleCorrectMarkers(n)),
    }
}

fn find_option(options: &[String], wanted: &str) -> Option<usize> {
    options
        .iter()
        .position(|o| o.trim().eq_ignore_ascii_case(wanted))
}

fn validate_shape(
    options: &[String],
    question_type: QuestionType,
    image_ref: Option<&str>,
) -> Result<(), ParseDefect> {
    match question_type {
        QuestionType::TrueFalse => {
            if options.len() != 2 {
                return Err(ParseDefect::NotBinary(options.len()));
            }
        }
        QuestionType::Mcq | QuestionType::Image => {
            if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
                return Err(ParseDefect::OptionCountOutOfRange {
                    found: options.len(),
                    min: MIN_OPTIONS,
                    max: MAX_OPTIONS,
                });
            }
        }
    }

    if question_type == QuestionType::Image && image_ref.map_or(true, |r| r.trim().is_empty()) {
        return Err(ParseDefect::MissingImageRef);
    }

    let mut seen: Vec<String> = Vec::new();
    for (i, option) in options.iter().enumerate() {
        let normalized = option.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ParseDefect::EmptyOption(i + 1));
        }
        if seen.contains(&normalized) {
            return Err(ParseDefect::DuplicateOption(option.clone()));
        }
        seen.push(normalized);
    }

    Ok(())
}

/// Re-serialize a parsed question in the template's own format. Feeding this
/// back through the parser yields an identical question, which keeps the
/// format convention honest.
pub fn render_canonical(question: &ParsedQuestion) -> String {
    let mut out = format!("1. {}\n", question.prompt);
    if let Some(url) = &question.image_ref {
        out.push_str(&format!("Image: {}\n", url));
    }
    let mut answer = 'A';
    for (i, option) in question.options.iter().enumerate() {
        let letter = (b'A' + i as u8) as char;
        out.push_str(&format!("{}. {}\n", letter, option.text));
        if option.correct {
            answer = letter;
        }
    }
    out.push_str(&format!("Answer: {}\n", answer));
    out
}
