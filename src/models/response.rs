// src/models/response.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'student_responses' table in the database.
///
/// `is_correct` and `submitted_at` are assigned by the server when the answer is
/// evaluated. `question_id` becomes `None` if the question is deleted afterwards.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub question_id: Option<i64>,
    pub answer: String,
    pub is_correct: bool,
    pub submitted_at: DateTime<Utc>,
}

/// DTO for submitting one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSubmission {
    pub student_id: i64,
    pub exam_id: i64,
    pub question_id: i64,
    /// May be empty when the question's time ran out.
    #[serde(default)]
    pub answer: String,
}
