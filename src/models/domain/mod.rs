pub mod grade_result;
pub mod question;
pub mod quiz;
pub mod submission;
pub mod user_progress;

pub use grade_result::{GradeResult, QuestionGrade};
pub use question::{Question, QuestionOption, QuestionType, MAX_OPTIONS, MIN_OPTIONS};
pub use quiz::{Difficulty, Quiz, QuizSource};
pub use submission::{Submission, SubmissionAnswer};
pub use user_progress::{Badge, UserProgress};
