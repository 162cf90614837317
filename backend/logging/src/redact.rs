//! Log Redaction Layer
//!
//! Scrubs API keys and access tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

const REDACTED: &str = "[REDACTED_TOKEN]";

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
static SECRET_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-[a-zA-Z0-9]{32,}").unwrap());
// `api-key: abc`, `"api_key": "abc"`, `apiKey=abc`
static API_KEY_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("?api[-_]?key"?\s*[:=]\s*"?)[^"\s,}&]+"#).unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, REDACTED);
    let redacted = SECRET_KEY_RE.replace_all(&redacted, REDACTED);
    API_KEY_FIELD_RE
        .replace_all(&redacted, format!("${{1}}{REDACTED}"))
        .into_owned()
}

/// Removes every occurrence of one known secret value.
pub fn redact_secret(input: &str, secret: &str) -> String {
    if secret.is_empty() {
        return input.to_string();
    }
    input.replace(secret, REDACTED)
}
