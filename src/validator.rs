//! # Schema Validation
//!
//! The gateway treats JSON-Schema validation as an opaque service:
//! `validate(instance, schema) -> [ValidationError]`, where an empty list means
//! valid. [`JsonSchemaValidator`] backs that service with the `jsonschema`
//! crate.
//!
//! ## Compiled schema cache
//!
//! Every schema of a compiled operation is a [`Schema`] carrying a process
//! unique id. [`JsonSchemaValidator`] keeps compiled validators keyed by that
//! id behind an `Arc<RwLock<HashMap>>`, so clones of the validator share one
//! cache across coroutines. The gateway precompiles every parameter and
//! response schema at registration; a schema first seen at request time is
//! compiled once and cached.
//!
//! Error paths are slash-delimited pointers into the instance (`/limit`,
//! `/pet/name`). A missing required property is reported at the path of the
//! property itself rather than at its parent object, so a missing `ip` query
//! parameter yields `/ip`.

use jsonschema::error::ValidationErrorKind;
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    pub path: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Outcome of validating one input set or one response payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// The `{ "valid": false, "errors": [...] }` wire envelope.
    pub fn envelope(&self) -> Value {
        json!({ "valid": self.valid, "errors": self.errors })
    }
}

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// A JSON schema with an identity that compiled forms are cached under.
///
/// Ids are never reused. Clones keep the id of their source, and equality
/// compares the schema document only.
#[derive(Clone)]
pub struct Schema {
    id: u64,
    value: Value,
}

impl Schema {
    pub fn new(value: Value) -> Self {
        Schema {
            id: NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed),
            value,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl From<Value> for Schema {
    fn from(value: Value) -> Self {
        Schema::new(value)
    }
}

impl Deref for Schema {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialEq<Value> for Schema {
    fn eq(&self, other: &Value) -> bool {
        &self.value == other
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

/// Stateless schema validation service.
pub trait SchemaValidator: Send + Sync {
    /// Validate `instance` against `schema`; an empty result means valid.
    fn validate(&self, instance: &Value, schema: &Schema) -> Vec<ValidationError>;

    /// Prepare `schema` ahead of the first request.
    ///
    /// Returns `true` when a compiled form is now cached. Validators that
    /// keep no compiled form return `false`.
    fn precompile(&self, _schema: &Schema) -> bool {
        false
    }
}

#[derive(Clone)]
enum Compiled {
    Ready(Arc<jsonschema::Validator>),
    Invalid(Arc<str>),
}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
///
/// Swagger 2.0 schemas are a JSON-Schema draft 4 dialect, which is the default.
/// Clones share the compiled schema cache.
#[derive(Clone)]
pub struct JsonSchemaValidator {
    draft: Draft,
    cache: Arc<RwLock<HashMap<u64, Compiled>>>,
    compilations: Arc<AtomicUsize>,
}

impl Default for JsonSchemaValidator {
    fn default() -> Self {
        Self::new(Draft::Draft4)
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("draft", &self.draft)
            .field("cached", &self.cached())
            .field("compilations", &self.compilations())
            .finish()
    }
}

impl JsonSchemaValidator {
    pub fn new(draft: Draft) -> Self {
        JsonSchemaValidator {
            draft,
            cache: Arc::new(RwLock::new(HashMap::new())),
            compilations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of schemas compiled so far, valid or not.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of cached entries.
    pub fn cached(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every cached validator.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn compiled(&self, schema: &Schema) -> Compiled {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&schema.id)
        {
            return hit.clone();
        }

        self.compilations.fetch_add(1, Ordering::Relaxed);
        let compiled = match jsonschema::options().with_draft(self.draft).build(&schema.value) {
            Ok(v) => Compiled::Ready(Arc::new(v)),
            Err(err) => {
                warn!(schema_id = schema.id, error = %err, "Schema does not compile");
                Compiled::Invalid(Arc::from(format!("Invalid schema: {err}")))
            }
        };
        debug!(schema_id = schema.id, "Schema compiled and cached");
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(schema.id)
            .or_insert(compiled)
            .clone()
    }
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn join_path(base: &str, token: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), escape_pointer_token(token))
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, instance: &Value, schema: &Schema) -> Vec<ValidationError> {
        let validator = match self.compiled(schema) {
            Compiled::Ready(v) => v,
            Compiled::Invalid(message) => return vec![ValidationError::new(message.as_ref(), "/")],
        };

        validator
            .iter_errors(instance)
            .map(|err| {
                let base = err.instance_path().to_string();
                let path = match err.kind() {
                    ValidationErrorKind::Required { property } => match property.as_str() {
                        Some(name) => join_path(&base, name),
                        None => base,
                    },
                    _ => base,
                };
                let path = if path.is_empty() { "/".to_string() } else { path };
                ValidationError::new(err.to_string(), path)
            })
            .collect()
    }

    fn precompile(&self, schema: &Schema) -> bool {
        matches!(self.compiled(schema), Compiled::Ready(_))
    }
}
