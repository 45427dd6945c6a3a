// src/handlers/exams.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::questions::{self, prepare_questions},
    models::exam::{CreateExamRequest, Exam, ExamRow, PublicExam, UpdateExamRequest},
    utils::{
        access_link::generate_access_link,
        html::{clean_html, clean_optional},
        jwt::Claims,
    },
};

pub(crate) const EXAM_COLUMNS: &str =
    "id, professor_id, name, description, access_link, created_at";

/// Attempts made to find an unused access link before giving up.
const ACCESS_LINK_ATTEMPTS: usize = 5;

pub(crate) async fn fetch_exam_row(pool: &PgPool, id: i64) -> Result<ExamRow, AppError> {
    sqlx::query_as::<_, ExamRow>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam {}: {:?}", id, e);
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Fetches an exam and checks it belongs to `professor_id`.
pub(crate) async fn owned_exam_row(
    pool: &PgPool,
    id: i64,
    professor_id: i64,
) -> Result<ExamRow, AppError> {
    let row = fetch_exam_row(pool, id).await?;
    if row.professor_id != professor_id {
        return Err(AppError::Forbidden("You do not own this exam".to_string()));
    }
    Ok(row)
}

/// Loads an exam together with its ordered questions.
pub(crate) async fn load_exam(pool: &PgPool, row: ExamRow) -> Result<Exam, AppError> {
    let questions = questions::fetch_for_exam(pool, row.id).await?;
    Ok(Exam::from_parts(row, questions))
}

/// Inserts the exam row under a fresh access link, retrying on collision.
async fn insert_exam_row(
    conn: &mut PgConnection,
    professor_id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<ExamRow, AppError> {
    for _ in 0..ACCESS_LINK_ATTEMPTS {
        let inserted = sqlx::query_as::<_, ExamRow>(&format!(
            r#"
            INSERT INTO exams (professor_id, name, description, access_link)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (access_link) DO NOTHING
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(professor_id)
        .bind(name)
        .bind(description)
        .bind(generate_access_link())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(row) = inserted {
            return Ok(row);
        }
        tracing::warn!("Access link collision, generating another");
    }

    Err(AppError::InternalServerError(
        "could not generate a unique access link".to_string(),
    ))
}

/// Lists the exams owned by the calling professor, newest first.
pub async fn list_exams(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ExamRow>(&format!(
        "SELECT {EXAM_COLUMNS} FROM exams WHERE professor_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(claims.professor_id()?)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::from(e)
    })?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut grouped = questions::fetch_for_exams(&pool, &ids).await?;

    let exams: Vec<Exam> = rows
        .into_iter()
        .map(|row| {
            let questions = grouped.remove(&row.id).unwrap_or_default();
            Exam::from_parts(row, questions)
        })
        .collect();

    Ok(Json(exams))
}

/// Retrieves one owned exam with its questions and correct answers.
pub async fn get_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = owned_exam_row(&pool, id, claims.professor_id()?).await?;
    Ok(Json(load_exam(&pool, row).await?))
}

/// Serves an exam to students by its public access link.
///
/// Correct answers are stripped. An exam without questions cannot be taken and is
/// reported exactly like a missing one.
pub async fn get_exam_by_access_link(
    State(pool): State<PgPool>,
    Path(access_link): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, ExamRow>(&format!(
        "SELECT {EXAM_COLUMNS} FROM exams WHERE access_link = $1"
    ))
    .bind(&access_link)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Exam not available".to_string()))?;

    let exam = load_exam(&pool, row).await?;
    if exam.questions.is_empty() {
        tracing::warn!(exam_id = exam.id, "Exam opened by link has no questions");
        return Err(AppError::NotFound("Exam not available".to_string()));
    }

    Ok(Json(PublicExam::from(exam)))
}

/// Creates an exam, generates its access link and stores any supplied questions.
pub async fn create_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let new_questions = prepare_questions(payload.questions)?;
    let professor_id = claims.professor_id()?;

    let name = clean_html(payload.name.trim());
    let description = clean_optional(payload.description.as_deref());

    let mut tx = pool.begin().await?;
    let row = insert_exam_row(&mut *tx, professor_id, &name, description.as_deref()).await?;
    let questions = questions::insert_questions(&mut *tx, row.id, 0, &new_questions).await?;
    tx.commit().await?;

    tracing::info!(
        exam_id = row.id,
        professor_id,
        questions = questions.len(),
        "exam created"
    );

    Ok((StatusCode::CREATED, Json(Exam::from_parts(row, questions))))
}

/// Updates name and description; when `questions` is given, replaces the question list.
pub async fn update_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let replacement = payload.questions.map(prepare_questions).transpose()?;
    owned_exam_row(&pool, id, claims.professor_id()?).await?;

    let name = clean_html(payload.name.trim());
    let description = clean_optional(payload.description.as_deref());

    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ExamRow>(&format!(
        "UPDATE exams SET name = $1, description = $2 WHERE id = $3 RETURNING {EXAM_COLUMNS}"
    ))
    .bind(&name)
    .bind(&description)
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update exam {}: {:?}", id, e);
        AppError::from(e)
    })?;

    if let Some(new_questions) = replacement {
        sqlx::query("DELETE FROM questions WHERE exam_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        questions::insert_questions(&mut *tx, id, 0, &new_questions).await?;
    }

    tx.commit().await?;

    Ok(Json(load_exam(&pool, row).await?))
}

/// Deletes an owned exam with its questions, responses and results.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_exam_row(&pool, id, claims.professor_id()?).await?;

    sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam {}: {:?}", id, e);
            AppError::from(e)
        })?;

    tracing::info!(exam_id = id, "exam deleted");
    Ok(StatusCode::NO_CONTENT)
}
