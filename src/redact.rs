// src/redact.rs

// Scrubbing of secrets from anything that gets logged or remembered.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static URI_CREDENTIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(://[^/\s:@]+:)([^@\s]+)(@)").unwrap());
static OPAQUE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_-]{32,}").unwrap());
static SENSITIVE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(pass(word)?|token|secret|key|authorization|auth|pwd)").unwrap()
});

/// Masks `user:password@` in URIs and long opaque tokens.
pub fn scrub(text: &str) -> String {
    let masked = URI_CREDENTIALS.replace_all(text, "${1}***${3}");
    OPAQUE_TOKEN.replace_all(&masked, "***").into_owned()
}

/// Returns a copy of `value` with sensitive keys masked and string values
/// scrubbed, recursively.
pub fn scrub_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(scrub(s)),
        Value::Array(items) => Value::Array(items.iter().map(scrub_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = if SENSITIVE_KEY.is_match(k) && !v.is_null() {
                        Value::String("***".into())
                    } else {
                        scrub_value(v)
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
