// src/models/resource.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'resources' table: metadata for uploaded study material.
/// The file bytes themselves live in external storage; only the path is kept.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: i64,
    pub subject: String,
    pub title: String,
    pub file_name: String,
    pub storage_path: String,
    pub uploaded_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for listing resources.
#[derive(Debug, Deserialize)]
pub struct ResourceListParams {
    pub subject: Option<String>,
}

/// DTO for registering an uploaded file.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 300))]
    pub file_name: String,
    #[validate(length(min = 1, max = 500))]
    pub storage_path: String,
}
