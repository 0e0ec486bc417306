//! # Gateway
//!
//! Registration entry point. A [`GatewayConfig`] names a specification; the
//! gateway loads it, compiles one [`OperationDescriptor`] per `(path,
//! method)`, checks every referenced around hook exists, builds the
//! routing table and precompiles every schema the operations validate
//! against. Registration either fully succeeds or returns a
//! [`CompileError`]; a failed registration never serves.
//!
//! ```rust,ignore
//! let mut dispatcher = Dispatcher::new();
//! unsafe { dispatcher.register_handler("Pet", "list_pets", list_pets) };
//! let gateway = Gateway::register(&GatewayConfig::from_url("doc/pets.yaml"), dispatcher)?;
//! let rendered = gateway.handle(RequestData::new(Method::GET, "/api/pets?limit=5"));
//! ```

mod config;

pub use config::{ConfigError, GatewayConfig, SpecSource};

use crate::dispatcher::{Dispatcher, RequestContext};
use crate::render::Rendered;
use crate::router::Router;
use crate::server::RequestData;
use crate::validator::SchemaValidator;
use crate::spec::{
    build_operations, fail_if_issues, load_spec, load_spec_from_value, CompileError, CompileIssue,
    CompileIssueKind, LoadedSpec, OperationDescriptor,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Load the configured document and compile its operations.
///
/// Used by [`Gateway::register`] and by tooling that only needs the table.
pub fn compile(config: &GatewayConfig) -> Result<Vec<OperationDescriptor>, CompileError> {
    let loaded: LoadedSpec = match config.source()? {
        SpecSource::Inline(doc) => load_spec_from_value(doc.clone()),
        SpecSource::Url(url) => load_spec(url),
    }
    .map_err(|e| CompileError::Load(format!("{e:#}")))?;
    build_operations(&loaded, config.mount().as_deref())
}

/// Compile every parameter and response schema of `operations` up front.
///
/// Returns how many schemas now have a cached compiled form.
pub fn precompile_schemas(
    operations: &[Arc<OperationDescriptor>],
    validator: &dyn SchemaValidator,
) -> usize {
    let mut total = 0;
    let mut compiled = 0;
    for schema in operations.iter().flat_map(|op| op.schemas()) {
        total += 1;
        if validator.precompile(schema) {
            compiled += 1;
        }
    }
    info!(
        schemas_total = total,
        schemas_compiled = compiled,
        "Schemas precompiled"
    );
    compiled
}

/// A compiled dispatch table bound to its controllers and hooks.
#[derive(Clone)]
pub struct Gateway {
    router: Router,
    dispatcher: Dispatcher,
}

impl Gateway {
    /// Load, compile and bind a specification.
    ///
    /// # Errors
    ///
    /// [`CompileError`] for an unusable config, an unloadable document, any
    /// operation without a controller, or a hook that is not registered on
    /// `dispatcher`.
    pub fn register(config: &GatewayConfig, dispatcher: Dispatcher) -> Result<Self, CompileError> {
        let operations = compile(config)?;
        Self::from_operations(operations, dispatcher)
    }

    /// Bind already compiled operations.
    pub fn from_operations(
        operations: Vec<OperationDescriptor>,
        dispatcher: Dispatcher,
    ) -> Result<Self, CompileError> {
        let mut issues = Vec::new();
        for op in &operations {
            if let Some(hook) = op.around_hook.as_deref() {
                if !dispatcher.hooks().contains(hook) {
                    issues.push(CompileIssue::new(
                        format!("{} {}", op.method, op.path_template),
                        CompileIssueKind::UnknownHook,
                        format!("around hook '{hook}' is not registered"),
                    ));
                }
            }
            if !dispatcher.has_method(&op.controller_name, &op.method_name) {
                warn!(
                    controller = %op.controller_name,
                    method_name = %op.method_name,
                    route = %op.route_template,
                    "No handler registered; requests will answer 501"
                );
            }
        }
        fail_if_issues(issues)?;

        let operations: Vec<Arc<OperationDescriptor>> = operations.into_iter().map(Arc::new).collect();
        for op in &operations {
            info!(
                method = %op.method,
                route = %op.route_template,
                controller = %op.controller_name,
                method_name = %op.method_name,
                around = ?op.around_hook,
                "Operation registered"
            );
        }
        let router = Router::new(&operations)?;
        precompile_schemas(&operations, dispatcher.validator());
        Ok(Gateway { router, dispatcher })
    }

    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationDescriptor>> {
        self.router.operations()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Route and run one request.
    ///
    /// Unknown routes, including a known path under another method, render
    /// `404 Not Found.`.
    pub fn handle(&self, request: RequestData) -> Rendered {
        let Some(route_match) = self.router.route(&request.method, &request.path) else {
            return Rendered::not_found();
        };
        let ctx = RequestContext::new(request, route_match.path_params);
        let rendered = self.dispatcher.handle(&route_match.operation, &ctx);
        info!(
            request_id = %ctx.request_id,
            operation = %route_match.operation.display_id(),
            status = rendered.status,
            error_count = rendered.errors.len(),
            "Request rendered"
        );
        rendered
    }
}
