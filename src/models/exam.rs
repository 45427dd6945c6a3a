// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{
    question::{PublicQuestion, Question, QuestionInput},
    validate_not_blank,
};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct ExamRow {
    pub id: i64,
    pub professor_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Opaque public token used by students instead of the numeric id.
    pub access_link: String,
    pub created_at: DateTime<Utc>,
}

/// An exam with its ordered questions, as seen by the owning professor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub professor_id: i64,
    pub access_link: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl Exam {
    pub fn from_parts(row: ExamRow, questions: Vec<Question>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            professor_id: row.professor_id,
            access_link: row.access_link,
            created_at: row.created_at,
            questions,
        }
    }
}

/// DTO for serving an exam to students: no owner, no correct answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExam {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub access_link: String,
    pub questions: Vec<PublicQuestion>,
}

impl From<Exam> for PublicExam {
    fn from(exam: Exam) -> Self {
        Self {
            id: exam.id,
            name: exam.name,
            description: exam.description,
            access_link: exam.access_link,
            questions: exam.questions.into_iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// DTO for creating an exam, optionally with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(
        length(min = 1, max = 200, message = "Exam name is required."),
        custom(function = validate_not_blank)
    )]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

/// DTO for updating an exam. When `questions` is present it replaces the whole list.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(
        length(min = 1, max = 200, message = "Exam name is required."),
        custom(function = validate_not_blank)
    )]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub questions: Option<Vec<QuestionInput>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_exam_name_is_rejected() {
        let req: CreateExamRequest =
            serde_json::from_value(serde_json::json!({ "name": "   " })).unwrap();
        assert!(req.validate().is_err());

        let req: CreateExamRequest =
            serde_json::from_value(serde_json::json!({ "name": "Biology" })).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.questions.is_empty());
    }
}
