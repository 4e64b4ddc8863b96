//! Profile blob parsing
//!
//! User rows carry an opaque serialized `profile` column in which several
//! historical shapes coexist: a current object with nested
//! `subscription`/`organization`/`metadata` sections, older blobs where
//! those sections are themselves JSON-encoded strings, and plain garbage.
//! Parsing is total: whatever cannot be recovered simply comes back empty
//! and must never abort the caller's aggregation.

use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Parsed, partial view over a user's profile blob
///
/// Absence of any field is valid; every accessor returns `Option`.
#[derive(Debug, Clone, Default)]
pub struct ProfileShape {
    root: Map<String, Value>,
}

impl ProfileShape {
    /// Parse an optional raw profile column into a shape
    ///
    /// Malformed or non-object input yields an empty shape. Double-encoded
    /// blobs (a JSON string containing a JSON object) are unwrapped one
    /// level, which is how the oldest rows were written.
    pub fn parse(raw: Option<&str>) -> Self {
        let root = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .as_ref()
            .and_then(coerce_object)
            .unwrap_or_default();
        Self { root }
    }

    /// Whether nothing could be recovered from the blob
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Raw value at a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// The whole recovered root object
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Top-level value coerced into a keyed record
    pub fn section(&self, key: &str) -> Option<Map<String, Value>> {
        self.root.get(key).and_then(coerce_object)
    }

    /// Top-level value coerced into a non-empty string
    pub fn str_field(&self, key: &str) -> Option<String> {
        self.root.get(key).and_then(coerce_string)
    }

    /// Explicit subscription record, wherever this row's era put it
    pub fn subscription(&self) -> Option<Map<String, Value>> {
        self.section("subscription")
            .or_else(|| self.section("subscriptionDetails"))
    }

    /// Organization sub-object
    pub fn organization(&self) -> Option<Map<String, Value>> {
        self.section("organization")
    }

    /// Free-form metadata sub-object
    pub fn metadata(&self) -> Option<Map<String, Value>> {
        self.section("metadata")
    }

    /// Payment sub-object
    pub fn payment(&self) -> Option<Map<String, Value>> {
        self.section("payment")
    }

    /// Billing sub-object
    pub fn billing(&self) -> Option<Map<String, Value>> {
        self.section("billing")
    }

    /// Invoice sub-object
    pub fn invoice(&self) -> Option<Map<String, Value>> {
        self.section("invoice")
    }
}

/// Coerce an arbitrary nested value into a keyed record
///
/// Objects pass through; strings get a second parse pass because sections
/// were stored pre-serialized in older profile shapes. Everything else is
/// not a record.
pub fn coerce_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

/// Coerce a value into a trimmed, non-empty string
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a value into a timestamp
///
/// Accepts RFC 3339 strings and integral unix epoch seconds, the two
/// encodings observed in stored subscription records.
pub fn coerce_timestamp(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(s) => OffsetDateTime::parse(s.trim(), &Rfc3339).ok(),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
