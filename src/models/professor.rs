// src/models/professor.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const PROFESSOR_ROLE: &str = "PROFESSOR";

/// Represents the 'professors' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Professor {
    pub id: i64,

    pub name: String,

    /// Unique login email.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub created_at: DateTime<Utc>,
}

/// Public profile of a professor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<Professor> for ProfessorProfile {
    fn from(p: Professor) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
            role: PROFESSOR_ROLE.to_string(),
        }
    }
}

/// Token plus profile, returned by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: ProfessorProfile,
}

/// DTO for creating a new professor account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterProfessorRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."), length(max = 254))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for professor login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
