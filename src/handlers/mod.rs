// src/handlers/mod.rs

pub mod auth;
pub mod exams;
pub mod questions;
pub mod responses;
pub mod results;
pub mod students;
