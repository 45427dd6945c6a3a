// tests/router_tests.rs
//
// Requests that are answered before any query runs, so the pool never connects.

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use quizwizard::{routes, state::AppState, utils::jwt::sign_jwt};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

const UNUSED_DB: &str = "postgres://localhost/quizwizard_unused";

fn app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy(UNUSED_DB)
        .expect("lazy pool");
    routes::create_router(AppState {
        pool,
        config: common::test_config(UNUSED_DB),
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn error_message(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn unknown_path_is_404() {
    let response = app()
        .oneshot(Request::get("/api/nothing-here").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authoring_requires_a_token() {
    let response = app()
        .oneshot(Request::get("/api/exams").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app()
        .oneshot(
            Request::get("/api/questions/exam/1")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let token = sign_jwt(1, "some-other-secret", 600).unwrap();
    let response = app()
        .oneshot(
            Request::get("/api/exams")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn blank_exam_name_is_rejected_before_storage() {
    let token = sign_jwt(1, common::JWT_SECRET, 600).unwrap();
    let mut request = json_request("POST", "/api/exams", json!({ "name": "   " }));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_question_in_new_exam_is_rejected() {
    let token = sign_jwt(1, common::JWT_SECRET, 600).unwrap();
    let mut request = json_request(
        "POST",
        "/api/exams",
        json!({
            "name": "Biology",
            "questions": [{
                "text": "Only one option",
                "type": "MULTIPLE_CHOICE",
                "options": ["Nucleus", " "],
                "correctAnswer": "Nucleus",
                "durationSeconds": 30
            }]
        }),
    );
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!error_message(response).await.is_empty());
}

#[tokio::test]
async fn student_registration_validates_email() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/api/students/register",
            json!({ "email": "not-an-email", "examId": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn professor_registration_validates_password() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/api/professors/register",
            json!({ "name": "Ada", "email": "ada@example.com", "password": "123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
