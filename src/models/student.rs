// src/models/student.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const STUDENT_ROLE: &str = "STUDENT";

/// Represents the 'students' table in the database.
/// Students are identified by email and never log in.
#[derive(Debug, Clone, FromRow)]
pub struct StudentRow {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Student as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            role: STUDENT_ROLE.to_string(),
        }
    }
}

/// DTO for registering a student against an exam.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegistrationRequest {
    #[validate(email(message = "A valid email address is required."), length(max = 254))]
    pub email: String,
    pub exam_id: i64,
}
