// src/main.rs

use quizwizard::config::Config;
use quizwizard::models::question::QuestionKind;
use quizwizard::routes;
use quizwizard::state::AppState;
use quizwizard::utils::hash::hash_password;
use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DB_CONNECT_RETRIES: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "quizwizard.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let pool = connect_with_retry(&config).await?;
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    if config.seed_demo {
        if let Err(e) = seed_demo_data(&pool).await {
            tracing::error!("Failed to seed demo data: {:?}", e);
        }
    }

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn connect_with_retry(config: &Config) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if retry_count >= DB_CONNECT_RETRIES => {
                tracing::error!("Failed to connect to database after {} retries", retry_count);
                return Err(e);
            }
            Err(_) => {
                retry_count += 1;
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Seeds a demo professor and the "Introduction to Biology" exam (link `biology101`).
async fn seed_demo_data(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    const EMAIL: &str = "prof@example.com";

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM professors WHERE email = $1")
        .bind(EMAIL)
        .fetch_optional(pool)
        .await?;

    if exists.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding demo professor: {}", EMAIL);
    let mut tx = pool.begin().await?;

    let professor_id: i64 = sqlx::query_scalar(
        "INSERT INTO professors (name, email, password) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind("Professor Smith")
    .bind(EMAIL)
    .bind(hash_password("password123")?)
    .fetch_one(&mut *tx)
    .await?;

    let exam_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO exams (professor_id, name, description, access_link)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(professor_id)
    .bind("Introduction to Biology")
    .bind("Test your knowledge of basic biology concepts")
    .bind("biology101")
    .fetch_one(&mut *tx)
    .await?;

    let questions = [
        (
            "What is the powerhouse of the cell?",
            QuestionKind::MultipleChoice {
                options: vec![
                    "Nucleus".into(),
                    "Mitochondria".into(),
                    "Golgi Apparatus".into(),
                    "Endoplasmic Reticulum".into(),
                ],
            },
            "Mitochondria",
            30,
        ),
        (
            "What is the chemical symbol for water?",
            QuestionKind::DirectAnswer,
            "H2O",
            20,
        ),
    ];

    for (position, (text, kind, correct, duration)) in questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions
                (exam_id, position, text, type, options, correct_answer, duration_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(exam_id)
        .bind(position as i32)
        .bind(*text)
        .bind(kind.tag())
        .bind(Json(kind.options().to_vec()))
        .bind(*correct)
        .bind(*duration)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!("Demo exam seeded with access link 'biology101'");
    Ok(())
}
