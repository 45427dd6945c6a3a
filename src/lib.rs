// src/lib.rs
//
// Server (handlers, routes) and the client used to take an exam (attempt)
// share the models and the grading rules.

pub mod attempt;
pub mod config;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

pub use routes::create_router;
