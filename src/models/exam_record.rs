// src/models/exam_record.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exam_records' table.
/// One row per completed exam, so a user's history accumulates over time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamRecord {
    pub id: i64,
    pub user_id: i64,
    pub subject: String,
    pub score: i64,
    pub total_questions: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for recording a finished exam.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitExamRequest {
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(range(min = 0))]
    pub score: i64,
    #[validate(range(min = 1, max = 500))]
    pub total_questions: i64,
}

/// Aggregated struct for displaying the leaderboard.
/// Represents a row joined from `users` and `exam_records`.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub subject: String,
    pub score: i64,
    pub total_questions: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One answered question inside an analysis request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub correct_answer: String,
    pub user_answer: String,
}

/// DTO for requesting a performance analysis of a completed exam.
#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeExamRequest {
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(length(min = 1, max = 100, message = "At least one answered question is required."))]
    pub answers: Vec<AnsweredQuestion>,
}
