use super::directives;
use super::error::{fail_if_issues, CompileError, CompileIssue, CompileIssueKind};
use super::load::LoadedSpec;
use super::naming::method_name_for;
use super::types::{
    CollectionFormat, OperationDescriptor, ParameterLocation, ParameterSpec, PlaceholderKind,
    ResponseSpec, Responses,
};
use crate::validator::Schema;
use http::Method;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const PLACEHOLDER_KEY: &str = "x-specgate-placeholder";

/// Operation keys of a path item, in registration order.
const METHODS: [(&str, Method); 7] = [
    ("get", Method::GET),
    ("put", Method::PUT),
    ("post", Method::POST),
    ("delete", Method::DELETE),
    ("options", Method::OPTIONS),
    ("head", Method::HEAD),
    ("patch", Method::PATCH),
];

/// Parameter object keys that describe transport, not the value's shape.
const NON_SCHEMA_KEYS: [&str; 7] = [
    "name",
    "in",
    "required",
    "collectionFormat",
    "allowEmptyValue",
    "description",
    PLACEHOLDER_KEY,
];

#[allow(clippy::expect_used)]
static TEMPLATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_\-]+)\}").expect("template token regex"));

/// Turn a parameter object into the schema of its value.
fn parameter_as_schema(param: &Map<String, Value>) -> Value {
    let mut schema: Map<String, Value> = param
        .iter()
        .filter(|(k, _)| !NON_SCHEMA_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if schema.get("type").and_then(Value::as_str) == Some("file") {
        schema.remove("type");
    }
    if let Some(Value::Object(items)) = schema.get_mut("items") {
        items.remove("collectionFormat");
    }
    Value::Object(schema)
}

/// Build a [`ParameterSpec`] from a (fully expanded) parameter object.
pub fn parse_parameter(param: &Value) -> Result<ParameterSpec, String> {
    let obj = param
        .as_object()
        .ok_or_else(|| "parameter must be a mapping".to_string())?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "parameter has no name".to_string())?
        .to_string();
    let location_raw = obj.get("in").and_then(Value::as_str).unwrap_or("");
    let location = ParameterLocation::parse(location_raw)
        .ok_or_else(|| format!("parameter '{name}' has unknown location '{location_raw}'"))?;
    let required = obj.get("required").and_then(Value::as_bool).unwrap_or(false);
    let items = obj.get("items");

    let placeholder = match obj.get(PLACEHOLDER_KEY) {
        None | Some(Value::Null) => PlaceholderKind::default(),
        Some(Value::String(s)) => PlaceholderKind::parse(s)
            .ok_or_else(|| format!("parameter '{name}' has unknown placeholder '{s}'"))?,
        Some(other) => return Err(format!("parameter '{name}' has invalid placeholder {other}")),
    };

    let collection_format = obj
        .get("collectionFormat")
        .or_else(|| items.and_then(|i| i.get("collectionFormat")))
        .and_then(Value::as_str)
        .map(CollectionFormat::parse);

    let schema = if location == ParameterLocation::Body {
        obj.get("schema").cloned().unwrap_or_else(|| json!({}))
    } else {
        let mut synthesized = json!({
            "type": "object",
            "properties": { name.as_str(): parameter_as_schema(obj) },
        });
        if required {
            synthesized["required"] = json!([name.as_str()]);
        }
        synthesized
    };

    let missing_schema = (location == ParameterLocation::Body).then(|| {
        Schema::new(json!({
            "type": "object",
            "properties": { name.as_str(): schema.clone() },
            "required": [name.as_str()],
        }))
    });

    Ok(ParameterSpec {
        location,
        param_type: obj.get("type").and_then(Value::as_str).map(str::to_string),
        required,
        default: obj.get("default").cloned(),
        collection_format,
        item_type: items
            .and_then(|i| i.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string),
        placeholder,
        schema: Schema::new(schema),
        missing_schema,
        name,
    })
}

/// Merge path-item and operation parameters.
///
/// An operation parameter with the same `(name, in)` replaces the path-level
/// one in place; new ones are appended.
fn merge_parameters(
    item: &Value,
    operation: &Value,
    location: &str,
    issues: &mut Vec<CompileIssue>,
) -> Vec<ParameterSpec> {
    let mut merged: Vec<ParameterSpec> = Vec::new();
    let declared = [item, operation]
        .into_iter()
        .filter_map(|scope| scope.get("parameters").and_then(Value::as_array))
        .flatten();
    for raw in declared {
        match parse_parameter(raw) {
            Ok(p) => {
                match merged
                    .iter_mut()
                    .find(|m| m.name == p.name && m.location == p.location)
                {
                    Some(existing) => *existing = p,
                    None => merged.push(p),
                }
            }
            Err(message) => issues.push(CompileIssue::new(
                location,
                CompileIssueKind::InvalidParameter,
                message,
            )),
        }
    }
    merged
}

/// Compile a path template into a route template with typed placeholders.
///
/// `/pets/{id}` becomes `/pets/:id` unless `id` overrides its placeholder kind.
/// The root template `/` under a non-empty mount is the mount itself, so
/// `/api` and `/api/` both reach it.
pub fn route_template_for(mount: &str, path_template: &str, parameters: &[ParameterSpec]) -> String {
    if path_template == "/" && !mount.is_empty() {
        return mount.to_string();
    }
    let compiled = TEMPLATE_TOKEN.replace_all(path_template, |caps: &Captures| {
        let name = &caps[1];
        let kind = parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Path && p.name == name)
            .map(|p| p.placeholder)
            .unwrap_or_default();
        format!("{}{}", kind.sigil(), name)
    });
    format!("{mount}{compiled}")
}

fn extract_responses(operation: &Value) -> Responses {
    operation
        .get("responses")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter(|(k, _)| !k.starts_with("x-"))
                .map(|(status, resp)| {
                    (
                        status.clone(),
                        ResponseSpec {
                            schema: resp.get("schema").cloned().map(Schema::new),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn extract_defaults(parameters: &[ParameterSpec]) -> BTreeMap<String, Value> {
    parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path)
        .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
        .collect()
}

/// Compile one operation node with its resolved directives.
fn compile_operation(
    root: &Value,
    path: &str,
    item: &Value,
    method: &Method,
    operation: &Value,
    mount: &str,
    issues: &mut Vec<CompileIssue>,
) -> Option<OperationDescriptor> {
    let location = format!("{method} {path}");

    let resolved = match directives::resolve(root, item, operation) {
        Ok(d) => d,
        Err(message) => {
            issues.push(CompileIssue::new(&location, CompileIssueKind::InvalidDirective, message));
            return None;
        }
    };
    let controller_name = match resolved.controller {
        Some(c) => c,
        None => {
            issues.push(CompileIssue::new(
                &location,
                CompileIssueKind::MissingController,
                format!("no {} declared on the operation or any enclosing scope", directives::CONTROLLER_KEY),
            ));
            return None;
        }
    };

    let operation_id = operation
        .get("operationId")
        .and_then(Value::as_str)
        .map(str::to_string);
    let method_name = method_name_for(operation_id.as_deref(), path);
    let parameters = merge_parameters(item, operation, &location, issues);
    let route_template = route_template_for(mount, path, &parameters);

    debug!(
        location = %location,
        controller = %controller_name,
        method_name = %method_name,
        route_template = %route_template,
        parameter_count = parameters.len(),
        "Operation compiled"
    );

    Some(OperationDescriptor {
        method: method.clone(),
        path_template: path.to_string(),
        route_template: Arc::from(route_template.as_str()),
        operation_id,
        method_name,
        controller_name,
        around_hook: resolved.around,
        responses: extract_responses(operation),
        defaults: extract_defaults(&parameters),
        parameters,
    })
}

/// Compile every operation of a loaded specification.
///
/// `mount` replaces the document's `basePath` when given. All operations are
/// compiled before failing so every issue is reported at once.
///
/// # Errors
///
/// Returns [`CompileError::Issues`] when any operation lacks a controller,
/// carries a malformed directive or parameter, or duplicates another route.
pub fn build_operations(
    spec: &LoadedSpec,
    mount: Option<&str>,
) -> Result<Vec<OperationDescriptor>, CompileError> {
    let mount = mount
        .map(|m| m.trim_end_matches('/').to_string())
        .unwrap_or_else(|| spec.base_path.clone());
    let root = &spec.document;
    let mut operations = Vec::new();
    let mut issues = Vec::new();
    let mut seen: HashSet<(Method, Arc<str>)> = HashSet::new();

    for (path, item) in spec.paths() {
        for (key, method) in METHODS.iter() {
            let Some(operation) = item.get(*key) else {
                continue;
            };
            if let Some(op) = compile_operation(root, path, item, method, operation, &mount, &mut issues) {
                if !seen.insert((op.method.clone(), Arc::clone(&op.route_template))) {
                    issues.push(CompileIssue::new(
                        format!("{method} {path}"),
                        CompileIssueKind::DuplicateRoute,
                        format!("route {} {} is declared more than once", op.method, op.route_template),
                    ));
                    continue;
                }
                operations.push(op);
            }
        }
    }

    fail_if_issues(issues)?;
    info!(
        operation_count = operations.len(),
        mount = %mount,
        "Specification compiled"
    );
    Ok(operations)
}
