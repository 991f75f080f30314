// src/handlers/analysis.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    ai::analyzer::ExamAnalyzer,
    error::AppError,
    models::exam_record::AnalyzeExamRequest,
    utils::jwt::Claims,
};

/// Produces a natural-language performance report for a completed exam.
///
/// The analysis degrades to a score-derived summary when the AI path is
/// unavailable, so this endpoint does not fail on upstream errors.
pub async fn analyze_exam(
    State(analyzer): State<Arc<ExamAnalyzer>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AnalyzeExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    tracing::info!(
        user = %claims.sub,
        subject = %payload.subject,
        answers = payload.answers.len(),
        "exam analysis requested"
    );

    let analysis = analyzer.analyze(&payload).await;

    Ok(Json(analysis))
}
