// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{error::AppError, models::question::PublicQuestion};

/// Query parameters for browsing the question bank.
#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub year: Option<i64>,
}

/// Lists bank questions, optionally filtered by subject, difficulty and year.
/// Answers and explanations are hidden by the DTO.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT id, subject, content, options, difficulty, year
        FROM questions
        WHERE ($1::TEXT IS NULL OR subject = $1)
          AND ($2::TEXT IS NULL OR difficulty = $2)
          AND ($3::BIGINT IS NULL OR year = $3)
        ORDER BY id DESC
        LIMIT 100
        "#,
    )
    .bind(&params.subject)
    .bind(&params.difficulty)
    .bind(params.year)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(questions))
}
