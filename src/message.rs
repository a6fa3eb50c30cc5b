//! Broadcast message value and payload validation
//!
//! A [`Message`] is an immutable JSON payload bound to a channel only at
//! publish time. [`MessageValidator`] enforces the configured shape limits:
//! total encoded size, per-field string length, and per-field array size,
//! recursing into nested objects and object array elements.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};

/// An immutable message to be broadcast to a channel
#[derive(Debug, Clone)]
pub struct Message {
    data: Value,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message from a JSON payload
    ///
    /// The payload must be a non-empty JSON object.
    pub fn new(data: Value) -> Result<Self> {
        let Some(map) = data.as_object() else {
            return Err(Error::Validation("Message data must be a JSON object".into()));
        };

        if map.is_empty() {
            return Err(Error::Validation("Message data cannot be empty".into()));
        }

        Ok(Self {
            data,
            timestamp: Utc::now(),
        })
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Message type from the conventional `type` field, `"unknown"` if absent
    pub fn message_type(&self) -> &str {
        self.data
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

/// Validates message payloads against configured size and shape limits
#[derive(Debug, Clone)]
pub struct MessageValidator {
    max_message_size: usize,
    max_string_length: usize,
    max_array_size: usize,
}

impl MessageValidator {
    pub fn new(max_message_size: usize, max_string_length: usize, max_array_size: usize) -> Self {
        Self {
            max_message_size,
            max_string_length,
            max_array_size,
        }
    }

    /// Validate a payload, returning every violation found
    ///
    /// An oversize payload short-circuits: content checks are skipped since
    /// the payload is rejected outright.
    pub fn validate(&self, data: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        let size_bytes = serde_json::to_vec(data).map(|b| b.len()).unwrap_or(0);
        if size_bytes > self.max_message_size {
            errors.push(format!(
                "Message too large: {} bytes (max: {})",
                size_bytes, self.max_message_size
            ));
            return errors;
        }

        let Some(map) = data.as_object() else {
            errors.push("Message must be a JSON object".into());
            return errors;
        };

        if map.is_empty() {
            errors.push("Message data cannot be empty".into());
            return errors;
        }

        self.validate_object(map, &mut errors, String::new());
        errors
    }

    fn validate_object(
        &self,
        map: &serde_json::Map<String, Value>,
        errors: &mut Vec<String>,
        prefix: String,
    ) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };

            match value {
                Value::String(s) => {
                    if s.chars().count() > self.max_string_length {
                        errors.push(format!(
                            "String field '{}' too long: {} chars (max: {})",
                            path,
                            s.chars().count(),
                            self.max_string_length
                        ));
                    }
                }
                Value::Array(items) => {
                    if items.len() > self.max_array_size {
                        errors.push(format!(
                            "Array field '{}' too large: {} items (max: {})",
                            path,
                            items.len(),
                            self.max_array_size
                        ));
                    }
                    for (i, item) in items.iter().enumerate() {
                        if let Value::Object(nested) = item {
                            self.validate_object(nested, errors, format!("{}[{}]", path, i));
                        }
                    }
                }
                Value::Object(nested) => {
                    self.validate_object(nested, errors, path);
                }
                _ => {}
            }
        }
    }
}
