use serde_json::{json, Value};

/// Pretty JSON with two-space indent. Object keys come out sorted since `Value` maps are ordered.
pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// The `{ "error": ... }` document printed for recoverable failures.
pub fn error_json(message: impl std::fmt::Display) -> Value {
    json!({ "error": message.to_string() })
}
