// tests/common/mod.rs

#![allow(dead_code)]

use quizwizard::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        log_dir: "logs".to_string(),
        seed_demo: false,
    }
}

/// Spawns the app on a random port against the database in `DATABASE_URL`.
/// Returns the base URL, or `None` when no database is configured.
pub async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState {
        pool,
        config: test_config(&database_url),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(format!("http://127.0.0.1:{}", port))
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

/// Registers a fresh professor and returns the bearer token.
pub async fn professor_token(client: &reqwest::Client, address: &str) -> String {
    let response = client
        .post(format!("{}/api/professors/register", address))
        .json(&json!({
            "name": "Professor Test",
            "email": unique_email("prof"),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Creates the two-question biology exam and returns its JSON.
pub async fn create_biology_exam(client: &reqwest::Client, address: &str, token: &str) -> Value {
    let response = client
        .post(format!("{}/api/exams", address))
        .bearer_auth(token)
        .json(&json!({
            "name": "Biology",
            "description": "Basic concepts",
            "questions": [
                {
                    "text": "What is the powerhouse of the cell?",
                    "type": "MULTIPLE_CHOICE",
                    "options": ["Nucleus", "Mitochondria", "  "],
                    "correctAnswer": "Mitochondria",
                    "durationSeconds": 30
                },
                {
                    "text": "What is the chemical symbol for water?",
                    "type": "DIRECT_ANSWER",
                    "correctAnswer": "H2O",
                    "durationSeconds": 20
                }
            ]
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}
