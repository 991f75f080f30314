// src/handlers/exams.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam_record::{ExamRecord, LeaderboardEntry, SubmitExamRequest},
    utils::jwt::Claims,
};

/// Records a finished exam for the current user.
/// Every submission appends a row, so the user's history accumulates.
pub async fn submit_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let record = sqlx::query_as::<_, ExamRecord>(
        r#"
        INSERT INTO exam_records (user_id, subject, score, total_questions)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, subject, score, total_questions, created_at
        "#,
    )
    .bind(user_id)
    .bind(&payload.subject)
    .bind(payload.score)
    .bind(payload.total_questions)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Lists the current user's exam history, newest first.
pub async fn my_exams(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let records = sqlx::query_as::<_, ExamRecord>(
        r#"
        SELECT id, user_id, subject, score, total_questions, created_at
        FROM exam_records
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT 50
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam history: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(records))
}

/// Retrieves the top 10 scores across all users.
pub async fn get_leaderboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT u.username, e.subject, e.score, e.total_questions, e.created_at
        FROM exam_records e
        JOIN users u ON e.user_id = u.id
        ORDER BY e.score DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}
