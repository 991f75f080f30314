// src/handlers/resources.rs

use axum::{Extension, Json, extract::{Query, State}, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::resource::{CreateResourceRequest, Resource, ResourceListParams},
    utils::jwt::Claims,
};

/// Lists study material metadata, optionally filtered by subject.
pub async fn list_resources(
    State(pool): State<PgPool>,
    Query(params): Query<ResourceListParams>,
) -> Result<impl IntoResponse, AppError> {
    let resources = sqlx::query_as::<_, Resource>(
        r#"
        SELECT id, subject, title, file_name, storage_path, uploaded_by, created_at
        FROM resources
        WHERE ($1::TEXT IS NULL OR subject = $1)
        ORDER BY created_at DESC
        LIMIT 200
        "#,
    )
    .bind(&params.subject)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list resources: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(resources))
}

/// Registers an uploaded file's metadata.
/// The bytes themselves are expected to already be in external storage.
pub async fn create_resource(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let resource = sqlx::query_as::<_, Resource>(
        r#"
        INSERT INTO resources (subject, title, file_name, storage_path, uploaded_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, subject, title, file_name, storage_path, uploaded_by, created_at
        "#,
    )
    .bind(&payload.subject)
    .bind(&payload.title)
    .bind(&payload.file_name)
    .bind(&payload.storage_path)
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create resource: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(resource)))
}
