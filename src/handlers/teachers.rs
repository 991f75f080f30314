// src/handlers/teachers.rs

use axum::{Extension, Json, extract::{Query, State}, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::teacher::{
        LiveStatusRequest, TeacherApplicationRequest, TeacherListParams, TeacherProfile,
    },
    utils::jwt::Claims,
};

/// Lists teachers joined with their user info.
/// `live=true` restricts the list to currently running sessions.
pub async fn list_teachers(
    State(pool): State<PgPool>,
    Query(params): Query<TeacherListParams>,
) -> Result<impl IntoResponse, AppError> {
    let teachers = sqlx::query_as::<_, TeacherProfile>(
        r#"
        SELECT t.id, t.user_id, u.username, u.display_name, t.subject, t.bio, t.is_live, t.call_link
        FROM teachers t
        JOIN users u ON u.id = t.user_id
        WHERE ($1::TEXT IS NULL OR t.subject = $1)
          AND ($2::BOOLEAN IS NULL OR t.is_live = $2)
        ORDER BY t.is_live DESC, t.id
        "#,
    )
    .bind(&params.subject)
    .bind(params.live)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list teachers: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(teachers))
}

/// Submits a teacher application for the current user.
/// Only one pending application per user is allowed.
pub async fn apply(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<TeacherApplicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let pending = sqlx::query("SELECT id FROM teacher_requests WHERE user_id = $1 AND status = 'pending'")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if pending.is_some() {
        return Err(AppError::Conflict(
            "An application is already pending for this user".to_string(),
        ));
    }

    let documents_json = serde_json::to_value(payload.documents.unwrap_or_default()).unwrap_or_default();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO teacher_requests (user_id, full_name, subject, qualifications, documents)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.full_name)
    .bind(&payload.subject)
    .bind(&payload.qualifications)
    .bind(documents_json)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create teacher application: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(json!({"id": id, "status": "pending"}))))
}

/// Lets a teacher open or close their live session.
pub async fn set_live_status(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LiveStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if claims.role != "teacher" && claims.role != "admin" {
        return Err(AppError::Forbidden("Only teachers can go live".to_string()));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    // A closed session keeps no stale call link around.
    let call_link = if payload.is_live { payload.call_link } else { None };

    let result = sqlx::query("UPDATE teachers SET is_live = $1, call_link = $2 WHERE user_id = $3")
        .bind(payload.is_live)
        .bind(&call_link)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update live status: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Teacher profile not found".to_string()));
    }

    Ok(StatusCode::OK)
}
