use anyhow::{anyhow, Context};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

const METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// Guards against pathological `$ref` chains.
const MAX_REF_DEPTH: usize = 32;

/// A fully expanded specification document.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSpec {
    /// The document with every local `$ref` replaced by its target
    pub document: Value,
    /// `basePath` normalised to `""` or `/segment...` without a trailing slash
    pub base_path: String,
}

impl LoadedSpec {
    /// Operation nodes as `(path template, path item)` pairs in document order.
    pub fn paths(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.document
            .get("paths")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|m| m.iter())
    }
}

/// Remove path-item keys that are neither operations nor shared path-item fields.
fn strip_unknown_verbs(val: &mut Value) {
    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for (path, item) in paths_map.iter_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let keep = match k.to_ascii_lowercase().as_str() {
                        "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    };
                    if !keep {
                        debug!(path = %path, key = %k, "Ignoring unknown path item key");
                    }
                    keep
                });
            }
        }
    }
}

fn normalize_base_path(raw: Option<&str>) -> String {
    let p = raw.unwrap_or("").trim_end_matches('/');
    if p.is_empty() {
        String::new()
    } else if p.starts_with('/') {
        p.to_string()
    } else {
        format!("/{p}")
    }
}

/// Resolve a local JSON pointer reference such as `#/definitions/Pet`.
fn resolve_pointer<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(root);
    }
    root.pointer(pointer)
}

fn expand_refs(root: &Value, value: &mut Value, stack: &mut Vec<String>) -> anyhow::Result<()> {
    match value {
        Value::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                if stack.iter().any(|r| r == reference) {
                    return Err(anyhow!("cyclic $ref '{reference}' cannot be expanded"));
                }
                if stack.len() >= MAX_REF_DEPTH {
                    return Err(anyhow!("$ref nesting deeper than {MAX_REF_DEPTH} levels"));
                }
                let target = resolve_pointer(root, reference)
                    .ok_or_else(|| anyhow!("unresolvable $ref '{reference}'"))?;
                let mut replacement = target.clone();
                stack.push(reference.to_string());
                expand_refs(root, &mut replacement, stack)?;
                stack.pop();
                *value = replacement;
                return Ok(());
            }
            for v in obj.values_mut() {
                expand_refs(root, v, stack)?;
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_refs(root, v, stack)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Expand every local `$ref` reachable from `paths` in place.
///
/// Sections such as `definitions` are only visited through references, so an
/// unused recursive definition does not prevent loading.
pub fn expand_document_refs(document: &mut Value) -> anyhow::Result<()> {
    let root = document.clone();
    let mut stack = Vec::new();
    if let Some(paths) = document.get_mut("paths") {
        expand_refs(&root, paths, &mut stack)?;
    }
    Ok(())
}

fn parse_document(content: &str, hint: &str) -> anyhow::Result<Value> {
    if hint.ends_with(".yaml") || hint.ends_with(".yml") {
        return serde_yaml::from_str(content).with_context(|| format!("parsing YAML from {hint}"));
    }
    if hint.ends_with(".json") {
        return serde_json::from_str(content).with_context(|| format!("parsing JSON from {hint}"));
    }
    // YAML is a superset of JSON
    serde_yaml::from_str(content).with_context(|| format!("parsing document from {hint}"))
}

fn read_source(source: &str) -> anyhow::Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!(url = %source, "Fetching specification");
        let response = reqwest::blocking::get(source)
            .with_context(|| format!("fetching {source}"))?
            .error_for_status()
            .with_context(|| format!("fetching {source}"))?;
        return response.text().with_context(|| format!("reading body of {source}"));
    }
    if source.starts_with("file://") {
        let url = url::Url::parse(source).with_context(|| format!("parsing {source}"))?;
        let path = url
            .to_file_path()
            .map_err(|_| anyhow!("'{source}' is not a local file URL"))?;
        return std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()));
    }
    std::fs::read_to_string(Path::new(source)).with_context(|| format!("reading {source}"))
}

/// Load and fully expand a specification from a file path or URL.
///
/// `.yaml`/`.yml` sources are parsed as YAML, `.json` as JSON, anything else
/// as YAML (which accepts JSON too).
pub fn load_spec(source: &str) -> anyhow::Result<LoadedSpec> {
    let content = read_source(source)?;
    let value = parse_document(&content, source)?;
    let loaded = load_spec_from_value(value)?;
    info!(
        source = %source,
        base_path = %loaded.base_path,
        path_count = loaded.paths().count(),
        "Specification loaded"
    );
    Ok(loaded)
}

/// Expand an already parsed document.
pub fn load_spec_from_value(mut value: Value) -> anyhow::Result<LoadedSpec> {
    if !value.is_object() {
        return Err(anyhow!("specification root must be a mapping"));
    }
    match value.get("swagger").and_then(Value::as_str) {
        Some("2.0") => {}
        Some(other) => warn!(version = %other, "Unexpected swagger version, expected 2.0"),
        None => warn!("Specification has no 'swagger' version field"),
    }

    strip_unknown_verbs(&mut value);
    expand_document_refs(&mut value)?;

    let base_path = normalize_base_path(value.get("basePath").and_then(Value::as_str));
    Ok(LoadedSpec {
        document: value,
        base_path,
    })
}
