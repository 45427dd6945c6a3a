// src/models/question.rs

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use validator::Validate;

use super::validate_not_blank;
use crate::{
    config::MAX_INLINE_IMAGE_BYTES,
    error::AppError,
    grading::{self, QuestionDefinition},
    utils::html::clean_html,
};

/// Answer format of a question.
///
/// Serialized inline with the question as `"type": "MULTIPLE_CHOICE"` plus an
/// `options` array, or `"type": "DIRECT_ANSWER"` with no options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    MultipleChoice { options: Vec<String> },
    DirectAnswer,
}

impl QuestionKind {
    pub const MULTIPLE_CHOICE: &'static str = "MULTIPLE_CHOICE";
    pub const DIRECT_ANSWER: &'static str = "DIRECT_ANSWER";

    /// Column value stored in `questions.type`.
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => Self::MULTIPLE_CHOICE,
            QuestionKind::DirectAnswer => Self::DIRECT_ANSWER,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            QuestionKind::MultipleChoice { options } => options,
            QuestionKind::DirectAnswer => &[],
        }
    }

    /// Rebuilds the kind from its stored columns.
    pub fn from_parts(tag: &str, options: Vec<String>) -> Option<Self> {
        match tag {
            Self::MULTIPLE_CHOICE => Some(QuestionKind::MultipleChoice { options }),
            Self::DIRECT_ANSWER => Some(QuestionKind::DirectAnswer),
            _ => None,
        }
    }
}

/// A question as seen by its owning professor, correct answer included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub correct_answer: String,
    pub duration_seconds: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

/// DTO for sending a question to a student (excludes the correct answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub duration_seconds: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            exam_id: q.exam_id,
            text: q.text,
            kind: q.kind,
            duration_seconds: q.duration_seconds,
            image_url: q.image_url,
            image_data: q.image_data,
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub exam_id: i64,
    pub position: i32,
    pub text: String,
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: String,
    pub duration_seconds: i32,
    pub image_url: Option<String>,
    pub image_data: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let kind = QuestionKind::from_parts(&row.question_type, row.options.0).ok_or_else(|| {
            AppError::InternalServerError(format!(
                "question {} has unknown type '{}'",
                row.id, row.question_type
            ))
        })?;

        Ok(Question {
            id: row.id,
            exam_id: row.exam_id,
            text: row.text,
            kind,
            correct_answer: row.correct_answer,
            duration_seconds: row.duration_seconds,
            image_url: row.image_url,
            image_data: row.image_data,
        })
    }
}

/// Authoring payload for one question, shared by exam and question endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[validate(
        length(max = 2000, message = "Question text must be at most 2000 characters."),
        custom(function = validate_not_blank, message = "Question text is required.")
    )]
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[validate(
        length(max = 500, message = "Correct answer must be at most 500 characters."),
        custom(function = validate_not_blank, message = "Correct answer is required.")
    )]
    pub correct_answer: String,
    pub duration_seconds: i32,
    #[validate(length(max = 2000), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub image_data: Option<String>,
}

/// A question that passed every authoring rule, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub text: String,
    pub definition: QuestionDefinition,
    pub image_url: Option<String>,
    pub image_data: Option<String>,
}

impl QuestionInput {
    /// Validates the payload and normalises it for storage.
    ///
    /// Runs the field checks, then the per-kind rules in [`grading::check_definition`].
    /// When both image forms are supplied the URL wins.
    pub fn into_new_question(self) -> Result<NewQuestion, AppError> {
        self.validate()?;

        let definition =
            grading::check_definition(self.kind, &self.correct_answer, self.duration_seconds)?;

        let image_data = match (&self.image_url, self.image_data) {
            (Some(_), _) => None,
            (None, Some(data)) if data.trim().is_empty() => None,
            (None, Some(data)) => {
                check_inline_image(&data)?;
                Some(data)
            }
            (None, None) => None,
        };

        Ok(NewQuestion {
            text: clean_html(self.text.trim()),
            definition,
            image_url: self.image_url,
            image_data,
        })
    }
}

/// DTO for adding a question to an existing exam.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub exam_id: i64,
    #[serde(flatten)]
    pub question: QuestionInput,
}

fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URI.
fn check_inline_image(data: &str) -> Result<(), AppError> {
    let payload = match data.strip_prefix("data:") {
        Some(uri) => uri
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| AppError::BadRequest("Image data URI must be base64 encoded".into()))?,
        None => data,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| AppError::BadRequest("Image data is not valid base64".into()))?;

    if bytes.len() > MAX_INLINE_IMAGE_BYTES {
        return Err(AppError::BadRequest("Image is too large".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: serde_json::Value) -> QuestionInput {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn multiple_choice_json_shape() {
        let q = input(serde_json::json!({
            "text": "What is the powerhouse of the cell?",
            "type": "MULTIPLE_CHOICE",
            "options": ["Nucleus", "Mitochondria"],
            "correctAnswer": "Mitochondria",
            "durationSeconds": 30
        }));
        assert_eq!(
            q.kind,
            QuestionKind::MultipleChoice {
                options: vec!["Nucleus".into(), "Mitochondria".into()]
            }
        );

        let stored = q.into_new_question().unwrap();
        assert_eq!(stored.definition.correct_answer, "Mitochondria");
    }

    #[test]
    fn direct_answer_serializes_without_options() {
        let q = Question {
            id: 2,
            exam_id: 1,
            text: "Chemical symbol for water?".into(),
            kind: QuestionKind::DirectAnswer,
            correct_answer: "H2O".into(),
            duration_seconds: 20,
            image_url: None,
            image_data: None,
        };
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "DIRECT_ANSWER");
        assert_eq!(value["correctAnswer"], "H2O");
        assert!(value.get("options").is_none());

        let public = serde_json::to_value(PublicQuestion::from(q)).unwrap();
        assert!(public.get("correctAnswer").is_none());
    }

    #[test]
    fn rejects_empty_text_and_bad_url() {
        let q = input(serde_json::json!({
            "text": "",
            "type": "DIRECT_ANSWER",
            "correctAnswer": "H2O",
            "durationSeconds": 20
        }));
        assert!(matches!(q.into_new_question(), Err(AppError::BadRequest(_))));

        let q = input(serde_json::json!({
            "text": "Look at this",
            "type": "DIRECT_ANSWER",
            "correctAnswer": "H2O",
            "durationSeconds": 20,
            "imageUrl": "not a url"
        }));
        assert!(matches!(q.into_new_question(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let q = input(serde_json::json!({
            "text": "   ",
            "type": "DIRECT_ANSWER",
            "correctAnswer": "H2O",
            "durationSeconds": 20
        }));
        assert!(matches!(q.into_new_question(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn long_correct_answer_gets_its_own_message() {
        let q = input(serde_json::json!({
            "text": "Spell it out",
            "type": "DIRECT_ANSWER",
            "correctAnswer": "a".repeat(501),
            "durationSeconds": 20
        }));
        let message = q.validate().unwrap_err().to_string();
        assert!(message.contains("at most 500"), "{message}");
        assert!(!message.contains("is required"), "{message}");

        let q = input(serde_json::json!({
            "text": "Spell it out",
            "type": "DIRECT_ANSWER",
            "correctAnswer": "",
            "durationSeconds": 20
        }));
        let message = q.validate().unwrap_err().to_string();
        assert!(message.contains("Correct answer is required."), "{message}");
    }

    #[test]
    fn url_wins_over_inline_image() {
        let q = input(serde_json::json!({
            "text": "Look at this",
            "type": "DIRECT_ANSWER",
            "correctAnswer": "cell",
            "durationSeconds": 20,
            "imageUrl": "https://cdn.example.com/cell.png",
            "imageData": "data:image/png;base64,aGVsbG8="
        }));
        let stored = q.into_new_question().unwrap();
        assert_eq!(stored.image_url.as_deref(), Some("https://cdn.example.com/cell.png"));
        assert!(stored.image_data.is_none());
    }

    #[test]
    fn inline_image_must_be_base64() {
        assert!(check_inline_image("data:image/png;base64,aGVsbG8=").is_ok());
        assert!(check_inline_image("aGVsbG8=").is_ok());
        assert!(check_inline_image("data:image/png,raw").is_err());
        assert!(check_inline_image("%%%").is_err());
    }

    #[test]
    fn question_text_is_sanitised() {
        let q = input(serde_json::json!({
            "text": "<b>Bold</b><script>alert(1)</script>",
            "type": "DIRECT_ANSWER",
            "correctAnswer": "x",
            "durationSeconds": 10
        }));
        let stored = q.into_new_question().unwrap();
        assert_eq!(stored.text, "<b>Bold</b>");
    }
}
