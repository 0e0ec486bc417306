use crate::render::Rendered;
use crate::spec::OperationDescriptor;
use crate::validator::SchemaValidator;
use serde_json::Value;
use tracing::warn;

/// Check a handler's output against the schema declared for `status`.
///
/// The schema for the exact status is used, else the `default` response's;
/// without either the payload is accepted as is. On failure the result is a
/// 500 carrying both the errors and the original payload.
pub fn validate_response(
    op: &OperationDescriptor,
    payload: Value,
    status: u16,
    validator: &dyn SchemaValidator,
) -> Rendered {
    let Some(schema) = op.response_schema(status) else {
        return Rendered::success(payload, status);
    };

    let errors = validator.validate(&payload, schema);
    if errors.is_empty() {
        return Rendered::success(payload, status);
    }

    warn!(
        operation = %op.display_id(),
        status = status,
        error_count = errors.len(),
        errors = ?errors,
        "Response failed output validation"
    );
    Rendered::output_invalid(errors, payload)
}
