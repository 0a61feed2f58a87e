//! Defaulted field accessors for configuration documents
//!
//! Documents are free-form JSON objects. Every accessor here falls back to a
//! caller-supplied default when the field is absent or has the wrong shape,
//! so one malformed field never poisons the rest of a document.

use serde_json::Value;

/// Type tag of a network document
pub const OBJTYPE_NETWORK: &str = "network";

/// Type tag of a member document
pub const OBJTYPE_MEMBER: &str = "member";

pub trait DocumentExt {
    /// Boolean field. Accepts JSON booleans, numbers (non-zero is true) and
    /// strings starting with `1`, `t` or `T`.
    fn bool_or(&self, key: &str, default: bool) -> bool;

    /// Unsigned integer field. Accepts non-negative numbers and decimal strings.
    fn u64_or(&self, key: &str, default: u64) -> u64;

    /// String field. Numbers and booleans are rendered, anything else defaults.
    fn str_or(&self, key: &str, default: &str) -> String;

    /// Array field, empty if absent or not an array.
    fn array(&self, key: &str) -> &[Value];
}

impl DocumentExt for Value {
    fn bool_or(&self, key: &str, default: bool) -> bool {
        value_bool(self.get(key), default)
    }

    fn u64_or(&self, key: &str, default: u64) -> u64 {
        value_u64(self.get(key), default)
    }

    fn str_or(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => default.to_string(),
        }
    }

    fn array(&self, key: &str) -> &[Value] {
        match self.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }
}

pub fn value_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Some(Value::String(s)) => matches!(s.chars().next(), Some('1' | 't' | 'T')),
        _ => default,
    }
}

pub fn value_u64(value: Option<&Value>, default: u64) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}
