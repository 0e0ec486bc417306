//! # Parameter Pipeline
//!
//! Turns a routed request into the validated input object handed to a
//! controller method. Every declared parameter, in declaration order, goes
//! through the same steps:
//!
//! 1. extract the raw value from its location (query, path, header, formData, body)
//! 2. substitute the declared `default` when absent
//! 3. skip it when still absent and not required
//! 4. coerce strings per declared type (numbers, booleans, collections)
//! 5. validate: body values against the body schema, with error paths
//!    prefixed by `/<name>`; every other value as `{name: value}` (or `{}`
//!    when absent) against its single-property object schema
//! 6. copy the value into the input object only when it produced no errors
//!
//! Errors from all parameters are collected; the request is valid only when
//! the list is empty.

mod coerce;
mod extract;

pub use coerce::{coerce, coerce_boolean, coerce_number, split_collection};
pub use extract::extract;

use crate::dispatcher::RequestContext;
use crate::spec::{OperationDescriptor, ParameterSpec};
use crate::validator::{SchemaValidator, ValidationError, ValidationResult};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// Result of running the pipeline over one request.
#[derive(Debug, Clone, PartialEq)]
pub struct InputOutcome {
    pub result: ValidationResult,
    /// Validated, coerced values keyed by parameter name
    pub input: Map<String, Value>,
}

fn prefix_body_path(name: &str, inner: &str) -> String {
    if inner.is_empty() || inner == "/" {
        format!("/{name}")
    } else {
        format!("/{name}{inner}")
    }
}

fn validate_parameter(
    param: &ParameterSpec,
    value: Option<&Value>,
    validator: &dyn SchemaValidator,
) -> Vec<ValidationError> {
    match (param.is_body(), value) {
        (true, Some(body)) => validator
            .validate(body, &param.schema)
            .into_iter()
            .map(|e| ValidationError::new(e.message, prefix_body_path(&param.name, &e.path)))
            .collect(),
        // A required body that never arrived is reported at `/<name>`
        (true, None) => match &param.missing_schema {
            Some(missing) => validator.validate(&json!({}), missing),
            None => vec![ValidationError::new(
                format!("Missing property: {}.", param.name),
                format!("/{}", param.name),
            )],
        },
        (false, Some(v)) => {
            let mut instance = Map::new();
            instance.insert(param.name.clone(), v.clone());
            validator.validate(&Value::Object(instance), &param.schema)
        }
        (false, None) => validator.validate(&json!({}), &param.schema),
    }
}

/// Run every declared parameter of `op` through the pipeline.
pub fn validate_input(
    op: &OperationDescriptor,
    ctx: &RequestContext,
    validator: &dyn SchemaValidator,
) -> InputOutcome {
    let mut errors = Vec::new();
    let mut input = Map::new();

    for param in &op.parameters {
        let raw = extract(param, ctx).or_else(|| param.default.clone());
        if raw.is_none() && !param.required {
            debug!(
                request_id = %ctx.request_id,
                parameter = %param.name,
                location = %param.location,
                "Optional parameter absent, skipped"
            );
            continue;
        }

        let value = raw.map(|v| coerce(param, v));
        let param_errors = validate_parameter(param, value.as_ref(), validator);
        debug!(
            request_id = %ctx.request_id,
            parameter = %param.name,
            location = %param.location,
            error_count = param_errors.len(),
            "Parameter validated"
        );

        if param_errors.is_empty() {
            if let Some(v) = value {
                input.insert(param.name.clone(), v);
            }
        } else {
            errors.extend(param_errors);
        }
    }

    let result = ValidationResult::from_errors(errors);
    if !result.valid {
        info!(
            request_id = %ctx.request_id,
            operation = %op.display_id(),
            error_count = result.errors.len(),
            errors = ?result.errors,
            "Input validation failed"
        );
    }
    InputOutcome { result, input }
}
