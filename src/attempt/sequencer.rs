// src/attempt/sequencer.rs

use thiserror::Error;
use tokio::sync::mpsc;
use validator::Validate;

use super::{
    client::{ApiError, ExamApi},
    timer::{Countdown, TimerWatch},
};
use crate::{
    grading,
    models::{
        exam::PublicExam,
        question::PublicQuestion,
        response::{ResponseSubmission, StudentResponse},
        result::ExamResult,
        student::{Student, StudentRegistrationRequest},
    },
};

/// Where an attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    AwaitingRegistration,
    InProgress { index: usize },
    /// Every answer is recorded but the result has not been calculated yet.
    Finalizing,
    Completed,
}

/// Outcome of recording one answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next { index: usize },
    Completed(ExamResult),
}

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("exam not available: {0}")]
    ExamUnavailable(String),

    #[error("exam has no questions")]
    NoQuestions,

    #[error("a valid email address is required")]
    InvalidEmail,

    #[error("answer is not a valid choice for this question")]
    NotSubmittable,

    #[error("not allowed in state {0:?}")]
    WrongState(AttemptState),

    #[error("answer input closed")]
    InputClosed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// One student's pass through one exam.
///
/// Questions are answered strictly in order and each produces exactly one
/// response. Any failed call leaves the state untouched so the same step can
/// be retried.
pub struct ExamAttempt<A> {
    api: A,
    exam: PublicExam,
    state: AttemptState,
    student: Option<Student>,
    candidate: Option<String>,
    responses: Vec<StudentResponse>,
    result: Option<ExamResult>,
    countdown: Option<(usize, Countdown)>,
}

impl<A: ExamApi> ExamAttempt<A> {
    /// Loads the exam behind `access_link`. Fails if it is missing or empty.
    pub async fn open(api: A, access_link: &str) -> Result<Self, AttemptError> {
        let exam = api
            .exam_by_access_link(access_link)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(message) => AttemptError::ExamUnavailable(message),
                other => AttemptError::Api(other),
            })?;

        Self::with_exam(api, exam)
    }

    pub fn with_exam(api: A, exam: PublicExam) -> Result<Self, AttemptError> {
        if exam.questions.is_empty() {
            tracing::warn!(exam_id = exam.id, "refusing to start an exam without questions");
            return Err(AttemptError::NoQuestions);
        }

        Ok(Self {
            api,
            exam,
            state: AttemptState::AwaitingRegistration,
            student: None,
            candidate: None,
            responses: Vec::new(),
            result: None,
            countdown: None,
        })
    }

    pub fn exam(&self) -> &PublicExam {
        &self.exam
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn student(&self) -> Option<&Student> {
        self.student.as_ref()
    }

    pub fn responses(&self) -> &[StudentResponse] {
        &self.responses
    }

    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    pub fn current_question(&self) -> Option<&PublicQuestion> {
        match self.state {
            AttemptState::InProgress { index } => self.exam.questions.get(index),
            _ => None,
        }
    }

    fn current_index(&self) -> Result<usize, AttemptError> {
        match self.state {
            AttemptState::InProgress { index } => Ok(index),
            ref other => Err(AttemptError::WrongState(other.clone())),
        }
    }

    fn student_id(&self) -> Result<i64, AttemptError> {
        self.student
            .as_ref()
            .map(|s| s.id)
            .ok_or_else(|| AttemptError::WrongState(self.state.clone()))
    }

    /// Registers the student and moves to the first question, or straight to
    /// `Completed` when this student already has a result for the exam.
    pub async fn register(&mut self, email: &str) -> Result<&Student, AttemptError> {
        if self.state != AttemptState::AwaitingRegistration {
            return Err(AttemptError::WrongState(self.state.clone()));
        }

        let request = StudentRegistrationRequest {
            email: email.trim().to_string(),
            exam_id: self.exam.id,
        };
        request.validate().map_err(|_| AttemptError::InvalidEmail)?;

        let student = self
            .api
            .register_student(&request.email, request.exam_id)
            .await?;
        let previous = self.api.result_for(student.id, self.exam.id).await?;

        match previous {
            Some(result) => {
                tracing::info!(
                    student_id = student.id,
                    exam_id = self.exam.id,
                    "attempt already completed"
                );
                self.result = Some(result);
                self.state = AttemptState::Completed;
            }
            None => {
                tracing::info!(student_id = student.id, exam_id = self.exam.id, "attempt started");
                self.state = AttemptState::InProgress { index: 0 };
            }
        }
        Ok(&*self.student.insert(student))
    }

    pub fn is_submittable(&self, candidate: &str) -> bool {
        self.current_question()
            .is_some_and(|q| grading::is_submittable(&q.kind, candidate))
    }

    /// Remembers the answer currently selected for the active question.
    pub fn choose(&mut self, candidate: impl Into<String>) -> Result<(), AttemptError> {
        self.current_index()?;
        self.candidate = Some(candidate.into());
        Ok(())
    }

    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    /// Submits `answer` for the active question.
    pub async fn submit(&mut self, answer: &str) -> Result<Advance, AttemptError> {
        let index = self.current_index()?;
        if !grading::is_submittable(&self.exam.questions[index].kind, answer) {
            return Err(AttemptError::NotSubmittable);
        }
        self.record(index, answer.to_string()).await
    }

    /// Time ran out on the active question. Submits the chosen candidate when it
    /// is a valid answer, otherwise an empty answer.
    pub async fn expire(&mut self) -> Result<Advance, AttemptError> {
        let index = self.current_index()?;
        let answer = self
            .candidate
            .clone()
            .filter(|c| grading::is_submittable(&self.exam.questions[index].kind, c))
            .unwrap_or_default();

        tracing::info!(
            question_id = self.exam.questions[index].id,
            answered = !answer.is_empty(),
            "question timed out"
        );
        self.record(index, answer).await
    }

    async fn record(&mut self, index: usize, answer: String) -> Result<Advance, AttemptError> {
        let submission = ResponseSubmission {
            student_id: self.student_id()?,
            exam_id: self.exam.id,
            question_id: self.exam.questions[index].id,
            answer,
        };

        let saved = self.api.submit_response(&submission).await?;
        self.responses.push(saved);
        self.candidate = None;
        self.countdown = None;

        if index + 1 < self.exam.questions.len() {
            self.state = AttemptState::InProgress { index: index + 1 };
            return Ok(Advance::Next { index: index + 1 });
        }

        self.state = AttemptState::Finalizing;
        self.finalize().await.map(Advance::Completed)
    }

    /// Calculates the result once every answer is in. Safe to call again after a failure.
    pub async fn finalize(&mut self) -> Result<ExamResult, AttemptError> {
        match self.state {
            AttemptState::Finalizing => {}
            AttemptState::Completed => {
                if let Some(result) = &self.result {
                    return Ok(result.clone());
                }
            }
            ref other => return Err(AttemptError::WrongState(other.clone())),
        }

        let student_id = self.student_id()?;
        let result = self.api.calculate_result(student_id, self.exam.id).await?;

        tracing::info!(
            student_id,
            exam_id = self.exam.id,
            total_score = result.total_score,
            max_score = result.max_score,
            "attempt completed"
        );
        self.result = Some(result.clone());
        self.state = AttemptState::Completed;
        Ok(result)
    }

    /// Starts the countdown for the active question, or returns the running one.
    pub fn arm_timer(&mut self) -> Result<TimerWatch, AttemptError> {
        let index = self.current_index()?;

        if !matches!(&self.countdown, Some((armed, _)) if *armed == index) {
            let seconds = u32::try_from(self.exam.questions[index].duration_seconds).unwrap_or(0);
            self.countdown = Some((index, Countdown::start(seconds)));
        }

        match &self.countdown {
            Some((_, countdown)) => Ok(countdown.watch()),
            None => Err(AttemptError::WrongState(self.state.clone())),
        }
    }

    /// Waits for either a submittable answer on `answers` or the question's
    /// countdown, whichever comes first, and records the outcome.
    ///
    /// Answers that are not valid for the question are kept as the current
    /// candidate and the wait continues. If recording fails, the countdown keeps
    /// running so a retry resumes with the remaining time.
    pub async fn answer_with_timer(
        &mut self,
        answers: &mut mpsc::Receiver<String>,
    ) -> Result<Advance, AttemptError> {
        self.arm_timer()?;
        let Some((index, mut countdown)) = self.countdown.take() else {
            return Err(AttemptError::WrongState(self.state.clone()));
        };

        loop {
            let event = tokio::select! {
                _ = countdown.expired() => None,
                answer = answers.recv() => Some(answer),
            };

            let outcome = match event {
                None => self.expire().await,
                Some(None) => return Err(AttemptError::InputClosed),
                Some(Some(answer)) => {
                    if !self.is_submittable(&answer) {
                        tracing::debug!(question_index = index, "ignoring invalid answer");
                        self.candidate = Some(answer);
                        continue;
                    }
                    self.submit(&answer).await
                }
            };

            if outcome.is_err() && self.state == (AttemptState::InProgress { index }) {
                self.countdown = Some((index, countdown));
            }
            return outcome;
        }
    }

    /// Stops the active countdown, e.g. when the attempt is abandoned.
    pub fn cancel_timer(&mut self) {
        self.countdown = None;
    }
}
