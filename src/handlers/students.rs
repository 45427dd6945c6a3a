// src/handlers/students.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::exams::fetch_exam_row,
    models::student::{Student, StudentRegistrationRequest, StudentRow},
};

const STUDENT_COLUMNS: &str = "id, email, created_at";

pub(crate) async fn fetch_student(pool: &PgPool, id: i64) -> Result<StudentRow, AppError> {
    sqlx::query_as::<_, StudentRow>(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Student not found".to_string()))
}

/// Registers a student by email against an exam.
///
/// Idempotent: the same email always maps to the same student. Returns 201 for a
/// new student and 200 when the email was already known. Exams without questions
/// cannot be entered and are reported as not found.
pub async fn register_student(
    State(pool): State<PgPool>,
    Json(payload): Json<StudentRegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = fetch_exam_row(&pool, payload.exam_id).await?;
    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
            .bind(exam.id)
            .fetch_one(&pool)
            .await?;

    if question_count == 0 {
        tracing::warn!(exam_id = exam.id, "Registration refused, exam has no questions");
        return Err(AppError::NotFound("Exam not available".to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    let inserted = sqlx::query_as::<_, StudentRow>(&format!(
        r#"
        INSERT INTO students (email)
        VALUES ($1)
        ON CONFLICT (email) DO NOTHING
        RETURNING {STUDENT_COLUMNS}
        "#
    ))
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to register student: {:?}", e);
        AppError::from(e)
    })?;

    let (status, row) = match inserted {
        Some(row) => (StatusCode::CREATED, row),
        None => {
            let row = sqlx::query_as::<_, StudentRow>(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students WHERE email = $1"
            ))
            .bind(&email)
            .fetch_one(&pool)
            .await?;
            (StatusCode::OK, row)
        }
    };

    tracing::info!(student_id = row.id, exam_id = exam.id, "student registered");
    Ok((status, Json(Student::from(row))))
}

/// Retrieves a student by id.
pub async fn get_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = fetch_student(&pool, id).await?;
    Ok(Json(Student::from(row)))
}
