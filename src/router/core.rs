use crate::spec::{
    fail_if_issues, CompileError, CompileIssue, CompileIssueKind, OperationDescriptor,
    PlaceholderKind,
};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of path parameters stored inline.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured placeholder values; names are shared with the compiled route.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([:#*])([A-Za-z0-9_\-]+)").expect("placeholder regex"));

/// Result of matching a request against the routing table.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub operation: Arc<OperationDescriptor>,
    pub path_params: ParamVec,
}

impl RouteMatch {
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    regex: Regex,
    param_names: Vec<Arc<str>>,
    operation: Arc<OperationDescriptor>,
}

/// Compile a route template (`/api/pets/:id`) into an anchored regex.
///
/// Placeholders capture:
/// - `:name` up to the next `/` or `.`
/// - `#name` up to the next `/`
/// - `*name` everything that remains
///
/// A final placeholder listed in `defaults` becomes optional together with
/// its leading `/`. A trailing `/` on the request is tolerated.
///
/// # Example
///
/// ```rust,ignore
/// let (re, names) = compile_template("/pets/:id", &BTreeMap::new())?;
/// assert!(re.is_match("/pets/7"));
/// assert_eq!(names, vec![Arc::from("id")]);
/// ```
pub fn compile_template(
    template: &str,
    defaults: &BTreeMap<String, Value>,
) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
    let mut pattern = String::with_capacity(template.len() + 16);
    pattern.push('^');
    let mut param_names = Vec::new();
    let mut last = 0;

    let tokens: Vec<_> = PLACEHOLDER.captures_iter(template).collect();
    for (idx, caps) in tokens.iter().enumerate() {
        let (Some(whole), Some(sigil), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let kind = sigil
            .as_str()
            .chars()
            .next()
            .and_then(PlaceholderKind::from_sigil)
            .unwrap_or_default();
        let capture = match kind {
            PlaceholderKind::Standard => "([^/.]+)",
            PlaceholderKind::Relaxed => "([^/]+)",
            PlaceholderKind::Wildcard => "(.+)",
        };

        let literal = &template[last..whole.start()];
        let is_final = idx + 1 == tokens.len() && whole.end() == template.len();
        let optional = is_final && literal.ends_with('/') && defaults.contains_key(name.as_str());
        if optional {
            pattern.push_str(&regex::escape(&literal[..literal.len() - 1]));
            pattern.push_str("(?:/");
            pattern.push_str(capture);
            pattern.push_str(")?");
        } else {
            pattern.push_str(&regex::escape(literal));
            pattern.push_str(capture);
        }
        param_names.push(Arc::from(name.as_str()));
        last = whole.end();
    }

    let tail = &template[last..];
    pattern.push_str(&regex::escape(tail));
    if template.is_empty() {
        pattern.push('/');
    } else if !template.ends_with('/') {
        pattern.push_str("/?");
    }
    pattern.push('$');

    Ok((Regex::new(&pattern)?, param_names))
}

fn default_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn percent_decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Method + path matching over compiled route templates.
///
/// Routes are tried in registration order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<(Method, CompiledRoute)>,
}

impl Router {
    /// Compile the route template of every operation.
    ///
    /// # Errors
    ///
    /// [`CompileError::Issues`] with [`CompileIssueKind::InvalidRoute`] for
    /// any template that does not compile.
    pub fn new(operations: &[Arc<OperationDescriptor>]) -> Result<Self, CompileError> {
        let mut routes = Vec::with_capacity(operations.len());
        let mut issues = Vec::new();

        for op in operations {
            match compile_template(&op.route_template, &op.defaults) {
                Ok((regex, param_names)) => {
                    debug!(
                        method = %op.method,
                        route = %op.route_template,
                        regex = %regex.as_str(),
                        "Route compiled"
                    );
                    routes.push((
                        op.method.clone(),
                        CompiledRoute {
                            regex,
                            param_names,
                            operation: Arc::clone(op),
                        },
                    ));
                }
                Err(e) => issues.push(CompileIssue::new(
                    format!("{} {}", op.method, op.path_template),
                    CompileIssueKind::InvalidRoute,
                    format!("route {} does not compile: {e}", op.route_template),
                )),
            }
        }
        fail_if_issues(issues)?;

        info!(routes_count = routes.len(), "Routing table loaded");
        Ok(Router { routes })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationDescriptor>> {
        self.routes.iter().map(|(_, r)| &r.operation)
    }

    /// Match `method` and `path` (without query string).
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");
        let started = Instant::now();

        for (route_method, route) in &self.routes {
            if route_method != method {
                continue;
            }
            let Some(caps) = route.regex.captures(path) else {
                continue;
            };

            let mut path_params = ParamVec::new();
            for (i, name) in route.param_names.iter().enumerate() {
                match caps.get(i + 1) {
                    Some(m) => path_params.push((Arc::clone(name), percent_decode(m.as_str()))),
                    None => {
                        if let Some(default) = route.operation.defaults.get(name.as_ref()) {
                            path_params.push((Arc::clone(name), default_as_text(default)));
                        }
                    }
                }
            }

            let elapsed = started.elapsed();
            if elapsed > Duration::from_millis(1) {
                warn!(
                    method = %method,
                    path = %path,
                    route = %route.operation.route_template,
                    duration_us = elapsed.as_micros() as u64,
                    "Slow route matching detected"
                );
            } else {
                info!(
                    method = %method,
                    path = %path,
                    route = %route.operation.route_template,
                    path_params = ?path_params,
                    duration_us = elapsed.as_micros() as u64,
                    "Route matched"
                );
            }
            return Some(RouteMatch {
                operation: Arc::clone(&route.operation),
                path_params,
            });
        }

        warn!(method = %method, path = %path, "No route matched");
        None
    }
}
