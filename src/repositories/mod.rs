pub mod quiz_repository;
pub mod submission_repository;
pub mod user_progress_repository;

pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use submission_repository::{MongoSubmissionRepository, SubmissionRepository};
pub use user_progress_repository::{MongoUserProgressRepository, UserProgressRepository};
