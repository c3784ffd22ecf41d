//! Best-effort redaction of secrets and personal data in captured diff lines.
//!
//! This is a heuristic, not a secret scanner. It catches long opaque tokens,
//! `password` assignments and email addresses; anything else (short keys,
//! split strings, encoded credentials) passes through. A line coming out of
//! [`sanitize_line`] unchanged says nothing about whether it is safe to share.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Marker substituted for redacted tokens and password values.
pub const REDACTED: &str = "[REDACTED]";

/// Marker substituted for email addresses.
pub const EMAIL_REDACTED: &str = "[EMAIL]";

static LONG_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9]{32,}\b").expect("token pattern is valid"));

static PASSWORD_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(password["']?\s*[:=]\s*)(?:"[^"]*"|'[^']*'|[^\s,;]+)"#)
        .expect("password pattern is valid")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

/// Redact one captured diff line.
///
/// Passes run in a fixed order: long tokens, then password values (which may
/// already contain a token marker), then emails, then trimming.
pub fn sanitize_line(line: &str) -> String {
    let result = LONG_TOKEN.replace_all(line, REDACTED);
    let result = PASSWORD_VALUE.replace_all(&result, format!("${{1}}{REDACTED}").as_str());
    let result = EMAIL.replace_all(&result, EMAIL_REDACTED);
    result.trim().to_string()
}
