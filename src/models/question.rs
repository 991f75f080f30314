// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table: the curated practice bank.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub subject: String,

    /// The text content of the question.
    pub content: String,

    /// The four answer options.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct answer letter ('A'..'D').
    pub answer: String,

    /// Explanation of the correct answer.
    pub explanation: Option<String>,

    pub difficulty: String,

    /// Exam year the question was drawn from, when known.
    pub year: Option<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a bank question to clients (hides answer and explanation).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub subject: String,
    pub content: String,
    pub options: Json<Vec<String>>,
    pub difficulty: String,
    pub year: Option<i64>,
}

/// DTO for creating a new bank question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 1))]
    pub answer: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub difficulty: String,
    pub year: Option<i64>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != 4 {
        return Err(validator::ValidationError::new("exactly_four_options_required"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("option_length_invalid"));
        }
    }
    Ok(())
}

/// Where a generated question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Ai,
    Fallback,
}

/// One AI- or template-generated multiple-choice question.
/// These are ephemeral: produced per request and never written to the bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    /// Synthetic identifier for this generation.
    pub id: String,
    pub subject: String,
    pub text: String,
    pub options: Vec<String>,
    /// Correct answer letter ('A'..'D').
    pub answer: String,
    pub explanation: String,
    pub source: QuestionSource,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for requesting a batch of generated questions.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuestionsRequest {
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(range(min = 1, max = 10, message = "Count must be between 1 and 10."))]
    pub count: usize,
    /// Optional unit learning objective to steer the questions.
    #[validate(length(max = 300))]
    pub objective: Option<String>,
    /// Optional challenge level (e.g., "standard", "hard").
    #[validate(length(max = 30))]
    pub challenge: Option<String>,
}

/// DTO returned by the generation endpoint.
#[derive(Debug, Serialize)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<GeneratedQuestion>,
    pub ai_count: usize,
    pub fallback_count: usize,
}
