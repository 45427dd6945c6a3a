// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exams, questions, responses, results, students},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public routes: professor auth and everything a student needs to take an exam.
/// * Professor routes: exam and question authoring, behind the bearer-token middleware.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let professor_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route(
            "/{id}",
            get(exams::get_exam)
                .put(exams::update_exam)
                .delete(exams::delete_exam),
        )
        .route("/{id}/results", get(results::list_exam_results))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Public: students open exams by link
        .merge(
            Router::new().route("/access/{access_link}", get(exams::get_exam_by_access_link)),
        );

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route("/exam/{exam_id}", get(questions::list_exam_questions))
        .route(
            "/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let student_routes = Router::new()
        .route("/register", post(students::register_student))
        .route("/{id}", get(students::get_student));

    let response_routes = Router::new()
        .route("/", post(responses::submit_response))
        .route(
            "/student/{student_id}/exam/{exam_id}",
            get(responses::list_responses),
        );

    let result_routes = Router::new()
        .route("/calculate", post(results::calculate_result))
        .route(
            "/student/{student_id}/exam/{exam_id}",
            get(results::get_result),
        );

    Router::new()
        .nest("/api/professors", professor_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/students", student_routes)
        .nest("/api/responses", response_routes)
        .nest("/api/results", result_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
