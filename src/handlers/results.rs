// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as DbJson};

use crate::{
    error::AppError,
    grading,
    handlers::{
        exams::{fetch_exam_row, owned_exam_row},
        questions,
        responses::fetch_attempt_responses,
        students::fetch_student,
    },
    models::result::{CalculateResultRequest, ExamResult, ExamResultRow},
    utils::jwt::Claims,
};

const RESULT_COLUMNS: &str = "\
    id, student_id, exam_id, total_score, max_score, percentage, \
    completed_at, question_results";

async fn find_result(
    pool: &PgPool,
    student_id: i64,
    exam_id: i64,
) -> Result<Option<ExamResult>, AppError> {
    let row = sqlx::query_as::<_, ExamResultRow>(&format!(
        "SELECT {RESULT_COLUMNS} FROM exam_results WHERE student_id = $1 AND exam_id = $2"
    ))
    .bind(student_id)
    .bind(exam_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(ExamResult::from))
}

/// Calculates and stores the result of an attempt.
///
/// Idempotent per (student, exam): once a result exists it is returned unchanged
/// with 200, so replaying the call never moves the score. A fresh result is 201.
pub async fn calculate_result(
    State(pool): State<PgPool>,
    Json(req): Json<CalculateResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student = fetch_student(&pool, req.student_id).await?;
    let exam = fetch_exam_row(&pool, req.exam_id).await?;

    if let Some(existing) = find_result(&pool, student.id, exam.id).await? {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let exam_questions = questions::fetch_for_exam(&pool, exam.id).await?;
    if exam_questions.is_empty() {
        return Err(AppError::NotFound("Exam not available".to_string()));
    }

    let responses = fetch_attempt_responses(&pool, student.id, exam.id).await?;
    let card = grading::aggregate(&exam_questions, &responses).map_err(|e| {
        tracing::error!(
            student_id = student.id,
            exam_id = exam.id,
            "Cannot aggregate attempt: {}",
            e
        );
        AppError::from(e)
    })?;

    let inserted = sqlx::query_as::<_, ExamResultRow>(&format!(
        r#"
        INSERT INTO exam_results
            (student_id, exam_id, total_score, max_score, percentage, question_results)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, exam_id) DO NOTHING
        RETURNING {RESULT_COLUMNS}
        "#
    ))
    .bind(student.id)
    .bind(exam.id)
    .bind(card.total_score)
    .bind(card.max_score)
    .bind(card.percentage)
    .bind(DbJson(&card.question_results))
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store exam result: {:?}", e);
        AppError::from(e)
    })?;

    match inserted {
        Some(row) => {
            tracing::info!(
                student_id = student.id,
                exam_id = exam.id,
                total = card.total_score,
                max = card.max_score,
                "exam result calculated"
            );
            Ok((StatusCode::CREATED, Json(ExamResult::from(row))))
        }
        // A concurrent request stored it first.
        None => {
            let existing = find_result(&pool, student.id, exam.id)
                .await?
                .ok_or_else(|| AppError::InternalServerError("exam result vanished".into()))?;
            Ok((StatusCode::OK, Json(existing)))
        }
    }
}

/// Retrieves the result of a completed attempt, 404 when there is none yet.
pub async fn get_result(
    State(pool): State<PgPool>,
    Path((student_id, exam_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let result = find_result(&pool, student_id, exam_id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    Ok(Json(result))
}

/// Lists every result of an owned exam, earliest completion first.
pub async fn list_exam_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_exam_row(&pool, exam_id, claims.professor_id()?).await?;

    let rows = sqlx::query_as::<_, ExamResultRow>(&format!(
        "SELECT {RESULT_COLUMNS} FROM exam_results WHERE exam_id = $1 ORDER BY completed_at, id"
    ))
    .bind(exam_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list results of exam {}: {:?}", exam_id, e);
        AppError::from(e)
    })?;

    let results: Vec<ExamResult> = rows.into_iter().map(ExamResult::from).collect();
    Ok(Json(results))
}
