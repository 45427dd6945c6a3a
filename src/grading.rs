// src/grading.rs

//! Answer rules shared by the server and the exam-taking client.
//!
//! * [`is_submittable`] decides whether a candidate answer may be sent.
//! * [`evaluate`] grades a submitted answer.
//! * [`aggregate`] turns the responses of one attempt into a score card.
//! * [`check_definition`] enforces the authoring rules of a question.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{MAX_QUESTION_DURATION_SECS, MIN_QUESTION_DURATION_SECS},
    models::{
        question::{Question, QuestionKind},
        response::StudentResponse,
    },
};

#[derive(Debug, Error, PartialEq)]
pub enum GradingError {
    #[error("{0}")]
    InvalidDefinition(String),

    #[error("response {response_id} does not reference a question of this exam")]
    OrphanedResponse { response_id: i64 },

    #[error("question {question_id} was answered more than once")]
    DuplicateResponse { question_id: i64 },
}

/// The validated, normalised content of a question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDefinition {
    pub kind: QuestionKind,
    pub correct_answer: String,
    pub duration_seconds: i32,
}

/// Per-question line of an exam result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: i64,
    pub is_correct: bool,
    pub student_answer: String,
    pub correct_answer: String,
}

/// Score of one attempt, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub question_results: Vec<QuestionResult>,
}

/// Whether `candidate` is well-formed enough to be submitted for a question of `kind`.
pub fn is_submittable(kind: &QuestionKind, candidate: &str) -> bool {
    match kind {
        QuestionKind::DirectAnswer => !candidate.trim().is_empty(),
        QuestionKind::MultipleChoice { options } => options.iter().any(|o| o == candidate),
    }
}

/// Case-insensitive comparison of trimmed answers, identical for both question kinds.
pub fn answers_match(correct_answer: &str, submitted: &str) -> bool {
    correct_answer.trim().to_lowercase() == submitted.trim().to_lowercase()
}

/// Grades `submitted` against the question's correct answer.
pub fn evaluate(question: &Question, submitted: &str) -> bool {
    answers_match(&question.correct_answer, submitted)
}

/// Score as a percentage of `max`, zero when there is nothing to score.
pub fn percentage(total: i32, max: i32) -> f64 {
    if max <= 0 {
        return 0.0;
    }
    f64::from(total) / f64::from(max) * 100.0
}

/// Builds the score card of one attempt.
///
/// `questions` must be in exam order. The denominator is the number of questions,
/// so an unanswered question counts as wrong and is reported with an empty answer.
/// A response that points at no question of the exam, or a second response for the
/// same question, is an integrity error rather than something to skip.
pub fn aggregate(
    questions: &[Question],
    responses: &[StudentResponse],
) -> Result<ScoreCard, GradingError> {
    let known: HashSet<i64> = questions.iter().map(|q| q.id).collect();
    let mut by_question: HashMap<i64, &StudentResponse> = HashMap::with_capacity(responses.len());

    for response in responses {
        let question_id = response
            .question_id
            .filter(|id| known.contains(id))
            .ok_or(GradingError::OrphanedResponse {
                response_id: response.id,
            })?;

        if by_question.insert(question_id, response).is_some() {
            return Err(GradingError::DuplicateResponse { question_id });
        }
    }

    let question_results: Vec<QuestionResult> = questions
        .iter()
        .map(|q| match by_question.get(&q.id) {
            Some(r) => QuestionResult {
                question_id: q.id,
                is_correct: r.is_correct,
                student_answer: r.answer.clone(),
                correct_answer: q.correct_answer.clone(),
            },
            None => QuestionResult {
                question_id: q.id,
                is_correct: false,
                student_answer: String::new(),
                correct_answer: q.correct_answer.clone(),
            },
        })
        .collect();

    let total_score = question_results.iter().filter(|r| r.is_correct).count() as i32;
    let max_score = questions.len() as i32;

    Ok(ScoreCard {
        total_score,
        max_score,
        percentage: percentage(total_score, max_score),
        question_results,
    })
}

/// Checks the authoring rules of a question and normalises it.
///
/// Multiple-choice options are trimmed and blank ones dropped; at least two options
/// that differ other than by case must remain and the correct answer must be one of them.
pub fn check_definition(
    kind: QuestionKind,
    correct_answer: &str,
    duration_seconds: i32,
) -> Result<QuestionDefinition, GradingError> {
    let invalid = |msg: &str| GradingError::InvalidDefinition(msg.to_string());

    if !(MIN_QUESTION_DURATION_SECS..=MAX_QUESTION_DURATION_SECS).contains(&duration_seconds) {
        return Err(GradingError::InvalidDefinition(format!(
            "Question duration must be between {} and {} seconds",
            MIN_QUESTION_DURATION_SECS, MAX_QUESTION_DURATION_SECS
        )));
    }

    let correct_answer = correct_answer.trim();
    if correct_answer.is_empty() {
        return Err(invalid("Correct answer is required"));
    }

    let kind = match kind {
        QuestionKind::DirectAnswer => QuestionKind::DirectAnswer,
        QuestionKind::MultipleChoice { options } => {
            let options: Vec<String> = options
                .iter()
                .map(|o| o.trim())
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();

            if options.len() < 2 {
                return Err(invalid(
                    "At least 2 options are required for multiple choice questions",
                ));
            }
            // Answers are compared case-insensitively, so options must be too.
            let distinct: HashSet<String> = options.iter().map(|o| o.to_lowercase()).collect();
            if distinct.len() != options.len() {
                return Err(invalid("Options must be unique"));
            }
            if !options.iter().any(|o| o == correct_answer) {
                return Err(invalid("Correct answer must be one of the options"));
            }
            QuestionKind::MultipleChoice { options }
        }
    };

    Ok(QuestionDefinition {
        kind,
        correct_answer: correct_answer.to_string(),
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn biology() -> Vec<Question> {
        vec![
            Question {
                id: 1,
                exam_id: 7,
                text: "What is the powerhouse of the cell?".into(),
                kind: QuestionKind::MultipleChoice {
                    options: vec!["Nucleus".into(), "Mitochondria".into()],
                },
                correct_answer: "Mitochondria".into(),
                duration_seconds: 30,
                image_url: None,
                image_data: None,
            },
            Question {
                id: 2,
                exam_id: 7,
                text: "What is the chemical symbol for water?".into(),
                kind: QuestionKind::DirectAnswer,
                correct_answer: "H2O".into(),
                duration_seconds: 20,
                image_url: None,
                image_data: None,
            },
        ]
    }

    fn response(id: i64, question: &Question, answer: &str) -> StudentResponse {
        StudentResponse {
            id,
            student_id: 3,
            exam_id: question.exam_id,
            question_id: Some(question.id),
            answer: answer.into(),
            is_correct: evaluate(question, answer),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_evaluate_ignores_case_and_surrounding_space() {
        let questions = biology();
        assert!(evaluate(&questions[0], "mitochondria"));
        assert!(evaluate(&questions[1], "  h2o "));
        assert!(!evaluate(&questions[1], "H 2 O"));
        assert!(!evaluate(&questions[1], ""));
    }

    #[test]
    fn test_submittable_direct_answer_needs_text() {
        assert!(is_submittable(&QuestionKind::DirectAnswer, "H2O"));
        assert!(!is_submittable(&QuestionKind::DirectAnswer, "   "));
    }

    #[test]
    fn test_submittable_multiple_choice_needs_an_offered_option() {
        let kind = biology().remove(0).kind;
        assert!(is_submittable(&kind, "Nucleus"));
        assert!(!is_submittable(&kind, "Ribosome"));
        assert!(!is_submittable(&kind, "nucleus"));
        assert!(!is_submittable(&kind, ""));
    }

    #[test]
    fn test_aggregate_perfect_score() {
        let questions = biology();
        let responses = vec![
            response(10, &questions[0], "Mitochondria"),
            response(11, &questions[1], "h2o"),
        ];

        let card = aggregate(&questions, &responses).unwrap();
        assert_eq!(card.total_score, 2);
        assert_eq!(card.max_score, 2);
        assert_eq!(card.percentage, 100.0);
        assert!(card.question_results.iter().all(|r| r.is_correct));
    }

    #[test]
    fn test_aggregate_wrong_and_expired() {
        let questions = biology();
        let responses = vec![
            response(10, &questions[0], "Nucleus"),
            response(11, &questions[1], ""),
        ];

        let card = aggregate(&questions, &responses).unwrap();
        assert_eq!(card.total_score, 0);
        assert_eq!(card.max_score, 2);
        assert_eq!(card.percentage, 0.0);
        assert_eq!(card.question_results[1].student_answer, "");
        assert_eq!(card.question_results[1].correct_answer, "H2O");
    }

    #[test]
    fn test_aggregate_missing_response_counts_against_max() {
        let questions = biology();
        // Responses arrive out of order and one is missing.
        let responses = vec![response(11, &questions[1], "H2O")];

        let card = aggregate(&questions, &responses).unwrap();
        assert_eq!(card.total_score, 1);
        assert_eq!(card.max_score, 2);
        assert_eq!(card.percentage, 50.0);
        assert_eq!(card.question_results[0].question_id, 1);
        assert!(!card.question_results[0].is_correct);
        assert_eq!(card.question_results[0].student_answer, "");
        assert_eq!(card.question_results[1].question_id, 2);
    }

    #[test]
    fn test_aggregate_rejects_orphans_and_duplicates() {
        let questions = biology();

        let mut orphan = response(12, &questions[0], "Nucleus");
        orphan.question_id = None;
        assert_eq!(
            aggregate(&questions, &[orphan]),
            Err(GradingError::OrphanedResponse { response_id: 12 })
        );

        let mut foreign = response(13, &questions[0], "Nucleus");
        foreign.question_id = Some(99);
        assert!(aggregate(&questions, &[foreign]).is_err());

        let twice = vec![
            response(14, &questions[0], "Nucleus"),
            response(15, &questions[0], "Mitochondria"),
        ];
        assert_eq!(
            aggregate(&questions, &twice),
            Err(GradingError::DuplicateResponse { question_id: 1 })
        );
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let questions = biology();
        let responses = vec![response(10, &questions[0], "Mitochondria")];
        assert_eq!(
            aggregate(&questions, &responses).unwrap(),
            aggregate(&questions, &responses).unwrap()
        );
    }

    #[test]
    fn test_percentage_guards_empty_exam() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(aggregate(&[], &[]).unwrap().percentage, 0.0);
    }

    #[test]
    fn test_definition_rules() {
        let mc = |opts: &[&str]| QuestionKind::MultipleChoice {
            options: opts.iter().map(|s| s.to_string()).collect(),
        };

        let def = check_definition(mc(&[" Nucleus ", "", "Mitochondria"]), "Mitochondria ", 30)
            .unwrap();
        assert_eq!(def.kind, mc(&["Nucleus", "Mitochondria"]));
        assert_eq!(def.correct_answer, "Mitochondria");

        assert!(check_definition(mc(&["Only", ""]), "Only", 30).is_err());
        assert!(check_definition(mc(&["A", "A"]), "A", 30).is_err());
        assert!(check_definition(mc(&["A", "B"]), "C", 30).is_err());
        assert!(check_definition(QuestionKind::DirectAnswer, "H2O", 4).is_err());
        assert!(check_definition(QuestionKind::DirectAnswer, "  ", 30).is_err());
        assert!(check_definition(QuestionKind::DirectAnswer, "H2O", 5).is_ok());
    }

    #[test]
    fn test_options_differing_only_by_case_are_duplicates() {
        let kind = QuestionKind::MultipleChoice {
            options: vec!["Mitochondria".into(), "mitochondria".into()],
        };
        let err = check_definition(kind, "Mitochondria", 30).unwrap_err();
        assert!(err.to_string().contains("Options must be unique"), "{err}");
    }
}
