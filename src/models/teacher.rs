// src/models/teacher.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// A teacher entry joined with the owning user row for display.
#[derive(Debug, Serialize, FromRow)]
pub struct TeacherProfile {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub subject: String,
    pub bio: Option<String>,

    /// Whether the teacher currently has a live session open.
    pub is_live: bool,

    /// Join link for the live session, when one is running.
    pub call_link: Option<String>,
}

/// Query parameters for listing teachers.
#[derive(Debug, Deserialize)]
pub struct TeacherListParams {
    pub subject: Option<String>,
    /// `live=true` restricts the list to currently running sessions.
    pub live: Option<bool>,
}

/// Represents the 'teacher_requests' table: pending applications.
#[derive(Debug, Serialize, FromRow)]
pub struct TeacherRequest {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub subject: String,
    pub qualifications: String,

    /// Paths of supporting documents already placed in storage.
    pub documents: Json<Vec<String>>,

    /// 'pending', 'approved' or 'rejected'.
    pub status: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a teacher application.
#[derive(Debug, Deserialize, Validate)]
pub struct TeacherApplicationRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(length(min = 1, max = 2000))]
    pub qualifications: String,
    pub documents: Option<Vec<String>>,
}

/// DTO for a teacher toggling their live session.
#[derive(Debug, Deserialize, Validate)]
pub struct LiveStatusRequest {
    pub is_live: bool,
    #[validate(length(max = 500))]
    pub call_link: Option<String>,
}

/// DTO for an admin resolving a teacher application.
#[derive(Debug, Deserialize)]
pub struct ReviewTeacherRequest {
    /// 'approved' or 'rejected'.
    pub status: String,
}
