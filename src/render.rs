//! Render contract shared by every stage of request handling.
//!
//! Each outcome, success or failure, is expressed as
//! `render(errors, payload, status)`. Errors always win on the wire: a
//! non-empty error list is written as the `{valid, errors}` envelope even
//! when a payload is carried alongside it.

use crate::validator::{ValidationError, ValidationResult};
use serde_json::Value;

/// A response ready to be written by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub status: u16,
    pub errors: Vec<ValidationError>,
    /// Handler output; kept on output-validation failures for diagnostics
    pub payload: Option<Value>,
}

/// Build a [`Rendered`] from its three parts.
pub fn render(errors: Vec<ValidationError>, payload: Option<Value>, status: u16) -> Rendered {
    Rendered {
        status,
        errors,
        payload,
    }
}

impl Rendered {
    pub fn success(payload: Value, status: u16) -> Self {
        render(Vec::new(), Some(payload), status)
    }

    /// 400 with the input errors.
    pub fn input_invalid(errors: Vec<ValidationError>) -> Self {
        render(errors, None, 400)
    }

    /// 500 with the output errors; `payload` is what the handler produced.
    pub fn output_invalid(errors: Vec<ValidationError>, payload: Value) -> Self {
        render(errors, Some(payload), 500)
    }

    pub fn controller_not_implemented() -> Self {
        Self::error(501, "Controller not implemented.")
    }

    pub fn method_not_implemented(operation: &str) -> Self {
        Self::error(501, format!("Method \"{operation}\" not implemented."))
    }

    pub fn handler_not_completed() -> Self {
        Self::error(500, "Handler did not complete.")
    }

    pub fn not_found() -> Self {
        Self::error(404, "Not Found.")
    }

    /// One error at the document root.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        render(vec![ValidationError::new(message, "/")], None, status)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The JSON value written on the wire.
    #[must_use]
    pub fn body(&self) -> Value {
        if self.is_error() {
            ValidationResult::from_errors(self.errors.clone()).envelope()
        } else {
            self.payload.clone().unwrap_or(Value::Null)
        }
    }

    /// Composite bodies are JSON; scalars are plain text.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self.body() {
            Value::Object(_) | Value::Array(_) => "application/json",
            _ => "text/plain",
        }
    }

    /// Serialized body: JSON for composites, the bare text of scalars, nothing for `null`.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        match self.body() {
            Value::Null => Vec::new(),
            Value::String(s) => s.into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }
}
