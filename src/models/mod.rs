// src/models/mod.rs

pub mod exam;
pub mod professor;
pub mod question;
pub mod response;
pub mod result;
pub mod student;

/// Rejects strings made only of whitespace, which `length(min = 1)` lets through.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}
