// src/handlers/questions.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool, types::Json as DbJson};

use crate::{
    error::AppError,
    handlers::exams::owned_exam_row,
    models::question::{CreateQuestionRequest, NewQuestion, Question, QuestionInput, QuestionRow},
    utils::jwt::Claims,
};

pub(crate) const QUESTION_COLUMNS: &str = "\
    id, exam_id, position, text, type, options, correct_answer, \
    duration_seconds, image_url, image_data";

/// Loads the questions of one exam in their fixed order.
pub(crate) async fn fetch_for_exam(pool: &PgPool, exam_id: i64) -> Result<Vec<Question>, AppError> {
    let rows = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY position, id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions of exam {}: {:?}", exam_id, e);
        AppError::from(e)
    })?;

    rows.into_iter().map(Question::try_from).collect()
}

/// Loads the questions of several exams, grouped by exam id and ordered.
pub(crate) async fn fetch_for_exams(
    pool: &PgPool,
    exam_ids: &[i64],
) -> Result<HashMap<i64, Vec<Question>>, AppError> {
    let mut grouped: HashMap<i64, Vec<Question>> = HashMap::new();
    if exam_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = ANY($1) ORDER BY exam_id, position, id"
    ))
    .bind(exam_ids)
    .fetch_all(pool)
    .await?;

    for row in rows {
        let question = Question::try_from(row)?;
        grouped.entry(question.exam_id).or_default().push(question);
    }
    Ok(grouped)
}

/// Appends validated questions to an exam, starting at `first_position`.
pub(crate) async fn insert_questions(
    conn: &mut PgConnection,
    exam_id: i64,
    first_position: i32,
    questions: &[NewQuestion],
) -> Result<Vec<Question>, AppError> {
    let mut stored = Vec::with_capacity(questions.len());

    for (offset, q) in questions.iter().enumerate() {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r#"
            INSERT INTO questions
                (exam_id, position, text, type, options, correct_answer,
                 duration_seconds, image_url, image_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(exam_id)
        .bind(first_position + offset as i32)
        .bind(&q.text)
        .bind(q.definition.kind.tag())
        .bind(DbJson(q.definition.kind.options().to_vec()))
        .bind(&q.definition.correct_answer)
        .bind(q.definition.duration_seconds)
        .bind(&q.image_url)
        .bind(&q.image_data)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert question for exam {}: {:?}", exam_id, e);
            AppError::from(e)
        })?;

        stored.push(Question::try_from(row)?);
    }

    Ok(stored)
}

/// Validates a batch of authoring payloads, failing on the first invalid one.
pub(crate) fn prepare_questions(inputs: Vec<QuestionInput>) -> Result<Vec<NewQuestion>, AppError> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            input.into_new_question().map_err(|e| match e {
                AppError::BadRequest(msg) => AppError::BadRequest(format!("Question {}: {}", i + 1, msg)),
                other => other,
            })
        })
        .collect()
}

/// Looks up a question and checks the caller owns its exam.
async fn owned_question(
    pool: &PgPool,
    question_id: i64,
    professor_id: i64,
) -> Result<Question, AppError> {
    let row = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
    ))
    .bind(question_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    owned_exam_row(pool, row.exam_id, professor_id).await?;
    Question::try_from(row)
}

/// Lists the questions of an owned exam in order.
pub async fn list_exam_questions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_exam_row(&pool, exam_id, claims.professor_id()?).await?;
    let questions = fetch_for_exam(&pool, exam_id).await?;
    Ok(Json(questions))
}

/// Retrieves a single question of an owned exam.
pub async fn get_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = owned_question(&pool, id, claims.professor_id()?).await?;
    Ok(Json(question))
}

/// Appends a question to the end of an owned exam.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_question = payload.question.into_new_question()?;
    owned_exam_row(&pool, payload.exam_id, claims.professor_id()?).await?;

    let mut tx = pool.begin().await?;

    let next_position: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE exam_id = $1",
    )
    .bind(payload.exam_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut stored = insert_questions(
        &mut *tx,
        payload.exam_id,
        next_position,
        std::slice::from_ref(&new_question),
    )
    .await?;
    tx.commit().await?;

    let question = stored
        .pop()
        .ok_or_else(|| AppError::InternalServerError("question insert returned no row".into()))?;

    tracing::info!(exam_id = payload.exam_id, question_id = question.id, "question added");
    Ok((StatusCode::CREATED, Json(question)))
}

/// Replaces the content of a question, keeping its position.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionInput>,
) -> Result<impl IntoResponse, AppError> {
    let q = payload.into_new_question()?;
    owned_question(&pool, id, claims.professor_id()?).await?;

    let row = sqlx::query_as::<_, QuestionRow>(&format!(
        r#"
        UPDATE questions SET
            text = $1, type = $2, options = $3, correct_answer = $4,
            duration_seconds = $5, image_url = $6, image_data = $7
        WHERE id = $8
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(&q.text)
    .bind(q.definition.kind.tag())
    .bind(DbJson(q.definition.kind.options().to_vec()))
    .bind(&q.definition.correct_answer)
    .bind(q.definition.duration_seconds)
    .bind(&q.image_url)
    .bind(&q.image_data)
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question {}: {:?}", id, e);
        AppError::from(e)
    })?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(Question::try_from(row)?))
}

/// Deletes a question. Responses already given to it become orphans.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_question(&pool, id, claims.professor_id()?).await?;

    sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question {}: {:?}", id, e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}
