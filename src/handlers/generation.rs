// src/handlers/generation.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    ai::generator::{GenerationError, QuestionGenerator},
    error::AppError,
    models::question::{GenerateQuestionsRequest, GenerateQuestionsResponse},
    utils::jwt::Claims,
};

/// Generates a batch of practice questions.
///
/// Prefers AI-generated content; slots the AI cannot fill come from the
/// static template bank, so the requested count is always honored unless
/// the upstream network is unreachable.
pub async fn generate_questions(
    State(generator): State<Arc<QuestionGenerator>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    tracing::info!(
        user = %claims.sub,
        subject = %payload.subject,
        count = payload.count,
        "question generation requested"
    );

    let batch = generator.generate(&payload).await.map_err(|e| match e {
        GenerationError::Offline(msg) => {
            AppError::Upstream(format!("generation aborted, no connectivity: {}", msg))
        }
        GenerationError::InvalidRequest(msg) => AppError::BadRequest(msg),
    })?;

    Ok(Json(GenerateQuestionsResponse {
        questions: batch.questions,
        ai_count: batch.ai_count,
        fallback_count: batch.fallback_count,
    }))
}
