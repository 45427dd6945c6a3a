// src/attempt/client.rs

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{
    exam::PublicExam,
    response::{ResponseSubmission, StudentResponse},
    result::{CalculateResultRequest, ExamResult},
    student::{Student, StudentRegistrationRequest},
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The server calls an exam attempt depends on.
#[async_trait]
pub trait ExamApi: Send + Sync {
    async fn exam_by_access_link(&self, access_link: &str) -> Result<PublicExam, ApiError>;

    async fn register_student(&self, email: &str, exam_id: i64) -> Result<Student, ApiError>;

    async fn submit_response(
        &self,
        submission: &ResponseSubmission,
    ) -> Result<StudentResponse, ApiError>;

    async fn calculate_result(&self, student_id: i64, exam_id: i64)
    -> Result<ExamResult, ApiError>;

    /// `Ok(None)` when the attempt has no result yet.
    async fn result_for(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamResult>, ApiError>;
}

#[async_trait]
impl<T: ExamApi + ?Sized> ExamApi for Arc<T> {
    async fn exam_by_access_link(&self, access_link: &str) -> Result<PublicExam, ApiError> {
        (**self).exam_by_access_link(access_link).await
    }

    async fn register_student(&self, email: &str, exam_id: i64) -> Result<Student, ApiError> {
        (**self).register_student(email, exam_id).await
    }

    async fn submit_response(
        &self,
        submission: &ResponseSubmission,
    ) -> Result<StudentResponse, ApiError> {
        (**self).submit_response(submission).await
    }

    async fn calculate_result(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<ExamResult, ApiError> {
        (**self).calculate_result(student_id, exam_id).await
    }

    async fn result_for(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamResult>, ApiError> {
        (**self).result_for(student_id, exam_id).await
    }
}

/// [`ExamApi`] over the JSON REST surface served by `create_router`.
#[derive(Debug, Clone)]
pub struct HttpExamApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExamApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| status.to_string());

        tracing::debug!(%status, %message, "request rejected");

        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(message))
        } else {
            Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn exam_by_access_link(&self, access_link: &str) -> Result<PublicExam, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/exams/access/{access_link}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn register_student(&self, email: &str, exam_id: i64) -> Result<Student, ApiError> {
        let body = StudentRegistrationRequest {
            email: email.to_string(),
            exam_id,
        };
        let response = self
            .client
            .post(self.url("/students/register"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn submit_response(
        &self,
        submission: &ResponseSubmission,
    ) -> Result<StudentResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/responses"))
            .json(submission)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn calculate_result(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<ExamResult, ApiError> {
        let body = CalculateResultRequest {
            student_id,
            exam_id,
        };
        let response = self
            .client
            .post(self.url("/results/calculate"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn result_for(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamResult>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/results/student/{student_id}/exam/{exam_id}")))
            .send()
            .await?;

        match Self::decode(response).await {
            Ok(result) => Ok(Some(result)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
