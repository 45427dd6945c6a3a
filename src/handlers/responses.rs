// src/handlers/responses.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    grading,
    handlers::{
        exams::fetch_exam_row,
        questions::QUESTION_COLUMNS,
        students::fetch_student,
    },
    models::{
        question::{Question, QuestionRow},
        response::{ResponseSubmission, StudentResponse},
    },
};

pub(crate) const RESPONSE_COLUMNS: &str =
    "r.id, r.student_id, r.exam_id, r.question_id, r.answer, r.is_correct, r.submitted_at";

/// All responses of one attempt, in exam question order.
/// Orphaned responses (question deleted) sort last.
pub(crate) async fn fetch_attempt_responses(
    pool: &PgPool,
    student_id: i64,
    exam_id: i64,
) -> Result<Vec<StudentResponse>, AppError> {
    let responses = sqlx::query_as::<_, StudentResponse>(&format!(
        r#"
        SELECT {RESPONSE_COLUMNS}
        FROM student_responses r
        LEFT JOIN questions q ON q.id = r.question_id
        WHERE r.student_id = $1 AND r.exam_id = $2
        ORDER BY q.position NULLS LAST, r.id
        "#
    ))
    .bind(student_id)
    .bind(exam_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch responses: {:?}", e);
        AppError::from(e)
    })?;

    Ok(responses)
}

/// Records one answer and grades it.
///
/// * The question must belong to the exam.
/// * Each question is answered at most once per student (409 otherwise).
/// * Once the attempt has a result no further answers are accepted (409).
/// * `isCorrect` and `submittedAt` are assigned here, never taken from the client.
pub async fn submit_response(
    State(pool): State<PgPool>,
    Json(payload): Json<ResponseSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let student = fetch_student(&pool, payload.student_id).await?;
    let exam = fetch_exam_row(&pool, payload.exam_id).await?;

    let question: Question = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND exam_id = $2"
    ))
    .bind(payload.question_id)
    .bind(exam.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found in this exam".to_string()))?
    .try_into()?;

    let completed: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM exam_results WHERE student_id = $1 AND exam_id = $2)",
    )
    .bind(student.id)
    .bind(exam.id)
    .fetch_one(&pool)
    .await?;

    if completed {
        return Err(AppError::Conflict("Attempt already completed".to_string()));
    }

    let is_correct = grading::evaluate(&question, &payload.answer);

    let saved = sqlx::query_as::<_, StudentResponse>(
        r#"
        INSERT INTO student_responses (student_id, exam_id, question_id, answer, is_correct)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (student_id, question_id) DO NOTHING
        RETURNING id, student_id, exam_id, question_id, answer, is_correct, submitted_at
        "#,
    )
    .bind(student.id)
    .bind(exam.id)
    .bind(question.id)
    .bind(&payload.answer)
    .bind(is_correct)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store response: {:?}", e);
        AppError::from(e)
    })?
    .ok_or(AppError::Conflict("Question already answered".to_string()))?;

    tracing::debug!(
        student_id = student.id,
        exam_id = exam.id,
        question_id = question.id,
        is_correct,
        "response recorded"
    );

    Ok((StatusCode::CREATED, Json(saved)))
}

/// Lists the responses of one attempt.
pub async fn list_responses(
    State(pool): State<PgPool>,
    Path((student_id, exam_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_student(&pool, student_id).await?;
    fetch_exam_row(&pool, exam_id).await?;

    let responses = fetch_attempt_responses(&pool, student_id, exam_id).await?;
    Ok(Json(responses))
}
