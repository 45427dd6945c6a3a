// src/utils/html.rs

/// Sanitises professor-authored rich text (exam name, description, question text).
///
/// Whitelist based: harmless formatting such as `<b>` or `<p>` survives, while
/// `<script>` (with its content), `<iframe>` and event-handler attributes are removed.
/// Answers and options are never passed through here, since they are compared verbatim.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(clean_html)
        .filter(|s| !s.trim().is_empty())
}
