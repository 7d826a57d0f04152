use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::grade_result::GradeResult;

/// Per-user aggregate of historical performance. Written only by the grading
/// engine; the `version` field backs the compare-and-swap save so concurrent
/// gradings for the same user never lose an update.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct UserProgress {
    pub user_id: String,
    pub version: i64,
    pub questions_attempted: i64,
    pub questions_correct: i64,
    pub quizzes_graded: i64,
    pub quizzes_passed: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    /// UTC calendar day of the most recent graded submission.
    pub last_graded_on: Option<NaiveDate>,
    pub badges: Vec<Badge>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstQuiz,
    PerfectScore,
    TenQuizzesPassed,
    SevenDayStreak,
    ThirtyDayStreak,
}

impl UserProgress {
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        UserProgress {
            user_id: user_id.to_string(),
            version: 0,
            questions_attempted: 0,
            questions_correct: 0,
            quizzes_graded: 0,
            quizzes_passed: 0,
            current_streak: 0,
            longest_streak: 0,
            last_graded_on: None,
            badges: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Fold one graded submission into the aggregate. `graded_on` is the UTC
    /// calendar day of the grade; passing it explicitly keeps this pure and
    /// testable.
    pub fn record_grade(&mut self, result: &GradeResult, graded_on: NaiveDate) {
        self.questions_attempted += result.total_questions as i64;
        self.questions_correct += result.score as i64;
        self.quizzes_graded += 1;
        if result.passed {
            self.quizzes_passed += 1;
        }

        self.record_graded_day(graded_on);
        self.evaluate_badges(result);
        self.modified_at = Utc::now();
    }

    /// Streak policy: UTC calendar days. Same day is a no-op, a one-day gap
    /// extends the streak, a longer gap resets it to 1. A day earlier than
    /// the recorded one (clock skew, backfill) is also a no-op.
    fn record_graded_day(&mut self, day: NaiveDate) {
        match self.last_graded_on {
            None => {
                self.current_streak = 1;
            }
            Some(prev) => {
                let gap = (day - prev).num_days();
                if gap < 0 {
                    return;
                } else if gap == 0 {
                    // already counted today
                } else if gap == 1 {
                    self.current_streak += 1;
                } else {
                    self.current_streak = 1;
                }
            }
        }

        self.last_graded_on = Some(self.last_graded_on.map_or(day, |prev| prev.max(day)));
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }

    /// Badge rules are evaluated against the already-updated counters and
    /// only ever append; re-evaluating never removes an earned badge.
    fn evaluate_badges(&mut self, result: &GradeResult) {
        if self.quizzes_graded >= 1 {
            self.award(Badge::FirstQuiz);
        }
        if result.is_perfect() {
            self.award(Badge::PerfectScore);
        }
        if self.quizzes_passed >= 10 {
            self.award(Badge::TenQuizzesPassed);
        }
        if self.current_streak >= 7 {
            self.award(Badge::SevenDayStreak);
        }
        if self.current_streak >= 30 {
            self.award(Badge::ThirtyDayStreak);
        }
    }

    fn award(&mut self, badge: Badge) {
        if !self.badges.contains(&badge) {
            self.badges.push(badge);
        }
    }
}
