// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::grading::QuestionResult;

/// Final score of one attempt (student x exam).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub completed_at: DateTime<Utc>,
    pub question_results: Vec<QuestionResult>,
}

/// Represents the 'exam_results' table in the database.
/// The per-question lines are stored as a JSON snapshot taken at calculation time.
#[derive(Debug, Clone, FromRow)]
pub struct ExamResultRow {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub completed_at: DateTime<Utc>,
    pub question_results: Json<Vec<QuestionResult>>,
}

impl From<ExamResultRow> for ExamResult {
    fn from(row: ExamResultRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            exam_id: row.exam_id,
            total_score: row.total_score,
            max_score: row.max_score,
            percentage: row.percentage,
            completed_at: row.completed_at,
            question_results: row.question_results.0,
        }
    }
}

/// DTO for requesting the result of an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResultRequest {
    pub student_id: i64,
    pub exam_id: i64,
}
