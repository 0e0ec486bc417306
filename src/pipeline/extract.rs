use crate::dispatcher::RequestContext;
use crate::spec::{CollectionFormat, ParameterLocation, ParameterSpec};
use serde_json::Value;

fn strings(values: Vec<&str>) -> Option<Value> {
    if values.is_empty() {
        None
    } else {
        Some(Value::Array(
            values.into_iter().map(|v| Value::String(v.to_string())).collect(),
        ))
    }
}

/// Read the raw value of `param` from its declared location.
///
/// Returns `None` when the request does not carry it. `multi` collections
/// yield an array of every occurrence; everything else takes the last one.
pub fn extract(param: &ParameterSpec, ctx: &RequestContext) -> Option<Value> {
    let request = &ctx.request;
    let multi = param.collection_format == Some(CollectionFormat::Multi);
    let name = param.name.as_str();

    match param.location {
        ParameterLocation::Query if multi => strings(request.query_values(name)),
        ParameterLocation::FormData if multi => strings(request.form_values(name)),
        ParameterLocation::Query => request.query_param(name).map(|v| Value::String(v.to_string())),
        ParameterLocation::FormData => request.form_param(name).map(|v| Value::String(v.to_string())),
        ParameterLocation::Header => request.header(name).map(|v| Value::String(v.to_string())),
        ParameterLocation::Path => ctx.path_param(name).map(|v| Value::String(v.to_string())),
        ParameterLocation::Body => request.body.clone(),
    }
}
