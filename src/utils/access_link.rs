// src/utils/access_link.rs

use uuid::Uuid;

use crate::config::ACCESS_LINK_LEN;

/// Generates an opaque public token for an exam.
///
/// Lowercase hex taken from a random v4 UUID; uniqueness is enforced by the
/// `exams.access_link` constraint and the caller retries on collision.
pub fn generate_access_link() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw[..ACCESS_LINK_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_short_hex_and_differ() {
        let a = generate_access_link();
        let b = generate_access_link();
        assert_eq!(a.len(), ACCESS_LINK_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
