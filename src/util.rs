/// Truncate `s` to at most `max_chars` characters, appending `...` when cut.
///
/// Counts `char`s rather than bytes so multi-byte text is never split
/// mid-codepoint.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

const API_ERROR_BODY_MAX_CHARS: usize = 200;

/// Turn a non-success upstream response into an error naming the service
/// and status. The body is collapsed to one line and capped.
pub async fn api_error(service: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow::anyhow!(
        "{service} API error ({status}): {}",
        sanitize_api_body(&body)
    )
}

fn sanitize_api_body(body: &str) -> String {
    let single_line = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.is_empty() {
        return "(empty body)".into();
    }
    truncate_with_ellipsis(&single_line, API_ERROR_BODY_MAX_CHARS)
}

/// Mask a credential for display, keeping only a short prefix.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "(unset)".into();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello", 5), "hello");
    }

    #[test]
    fn long_text_gets_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
    }

    #[test]
    fn truncation_is_utf8_safe_for_multibyte_text() {
        let text = "안녕하세요 WolfyBot";
        let out = truncate_with_ellipsis(text, 3);
        assert_eq!(out, "안녕하...");
    }

    #[test]
    fn api_body_is_collapsed_and_capped() {
        assert_eq!(sanitize_api_body("  \n "), "(empty body)");
        assert_eq!(sanitize_api_body("bad\n  request"), "bad request");
        let long = "x".repeat(500);
        assert_eq!(sanitize_api_body(&long).chars().count(), 203);
    }

    #[test]
    fn redact_keeps_prefix_only() {
        assert_eq!(redact("xoxb-123456"), "xoxb***");
        assert_eq!(redact(""), "(unset)");
    }
}
