use super::response::validate_response;
use crate::hooks::{run_around, AroundHook, HookRegistry};
use crate::ids::RequestId;
use crate::pipeline::validate_input;
use crate::render::{render, Rendered};
use crate::router::ParamVec;
use crate::runtime_config::RuntimeConfig;
use crate::server::RequestData;
use crate::spec::OperationDescriptor;
use crate::validator::{JsonSchemaValidator, SchemaValidator, ValidationError};
use may::coroutine;
use may::sync::mpsc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Everything known about a request once it has been routed.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub request: RequestData,
    /// Placeholder values captured by the router, defaults included
    pub path_params: ParamVec,
}

impl RequestContext {
    pub fn new(request: RequestData, path_params: ParamVec) -> Self {
        RequestContext {
            request_id: RequestId::for_request(&request),
            request,
            path_params,
        }
    }

    /// Last captured value for `name`.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What a handler coroutine produced.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Value,
    /// Errors reported by the handler itself; rendered as the envelope
    pub errors: Vec<ValidationError>,
}

/// One-shot reply channel owned by a [`HandlerRequest`].
///
/// Resolving consumes the completion, so a request can be completed at most
/// once. Dropping it unresolved (including through a panic) renders a 500.
/// The completion is `Send`: it may be moved to another coroutine and
/// resolved later.
pub struct Completion {
    request_id: RequestId,
    reply_tx: mpsc::Sender<HandlerResponse>,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

impl Completion {
    fn send(self, response: HandlerResponse) {
        let status = response.status;
        if self.reply_tx.send(response).is_err() {
            warn!(
                request_id = %self.request_id,
                status = status,
                "Completion delivered after the request was abandoned"
            );
        }
    }

    /// Resolve with a payload; it is checked against the response schema for `status`.
    pub fn complete(self, payload: Value, status: u16) {
        self.send(HandlerResponse {
            status,
            body: payload,
            errors: Vec::new(),
        })
    }

    pub fn ok(self, payload: Value) {
        self.complete(payload, 200)
    }

    /// Resolve with errors; rendered as the error envelope without output validation.
    pub fn fail(self, status: u16, errors: Vec<ValidationError>) {
        self.send(HandlerResponse {
            status,
            body: Value::Null,
            errors,
        })
    }
}

/// Invocation of one controller method.
#[derive(Debug)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub operation_id: Option<String>,
    pub controller: String,
    pub method_name: String,
    /// Validated input object built by the parameter pipeline
    pub input: Map<String, Value>,
    pub completion: Completion,
}

impl HandlerRequest {
    pub fn complete(self, payload: Value, status: u16) {
        self.completion.complete(payload, status)
    }

    pub fn ok(self, payload: Value) {
        self.completion.ok(payload)
    }

    pub fn fail(self, status: u16, errors: Vec<ValidationError>) {
        self.completion.fail(status, errors)
    }

    #[must_use]
    pub fn input_value(&self, name: &str) -> Option<&Value> {
        self.input.get(name)
    }
}

pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Controller registry and request invocation.
///
/// Controllers are addressed by name and hold methods addressed by the
/// derived method name. Each method runs in its own coroutine fed by a
/// channel.
#[derive(Clone)]
pub struct Dispatcher {
    controllers: HashMap<String, HashMap<String, HandlerSender>>,
    hooks: HookRegistry,
    validator: Arc<dyn SchemaValidator>,
    runtime: RuntimeConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            controllers: HashMap::new(),
            hooks: HookRegistry::new(),
            validator: Arc::new(JsonSchemaValidator::default()),
            runtime: RuntimeConfig::from_env(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn validator(&self) -> &dyn SchemaValidator {
        self.validator.as_ref()
    }

    /// Declare a controller with no methods yet.
    ///
    /// Operations routed to it answer "Method not implemented" rather than
    /// "Controller not implemented".
    pub fn declare_controller(&mut self, controller: &str) {
        self.controllers.entry(controller.to_string()).or_default();
    }

    #[must_use]
    pub fn has_controller(&self, controller: &str) -> bool {
        self.controllers.contains_key(controller)
    }

    #[must_use]
    pub fn has_method(&self, controller: &str, method: &str) -> bool {
        self.controllers
            .get(controller)
            .is_some_and(|m| m.contains_key(method))
    }

    pub fn register_hook(&mut self, name: &str, hook: Arc<dyn AroundHook>) {
        self.hooks.register(name, hook);
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Spawn a coroutine serving `controller#method`.
    ///
    /// Re-registering a method replaces it; the old coroutine exits once its
    /// channel drains. Panics inside `handler_fn` are caught and logged, and
    /// the dropped completion renders a 500 for that request.
    ///
    /// # Safety
    ///
    /// Spawns a `may` coroutine, which the runtime marks unsafe. Call during
    /// startup; `handler_fn` must not rely on thread-local state.
    pub unsafe fn register_handler<F>(&mut self, controller: &str, method: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let stack_size = self.runtime.stack_size;
        let label = format!("{controller}#{method}");
        let coroutine_label = label.clone();

        let spawn_result = unsafe {
            coroutine::Builder::new()
                .name(label.clone())
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(handler = %coroutine_label, stack_size = stack_size, "Handler coroutine start");
                    for req in rx.iter() {
                        let request_id = req.request_id;
                        let started = Instant::now();
                        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            handler_fn(req);
                        }));
                        match outcome {
                            Ok(()) => debug!(
                                request_id = %request_id,
                                handler = %coroutine_label,
                                execution_us = started.elapsed().as_micros() as u64,
                                "Handler returned"
                            ),
                            Err(panic) => error!(
                                request_id = %request_id,
                                handler = %coroutine_label,
                                panic_message = %panic_message(panic.as_ref()),
                                "Handler panicked"
                            ),
                        }
                    }
                    debug!(handler = %coroutine_label, "Handler coroutine exit");
                })
        };

        if let Err(e) = spawn_result {
            error!(
                handler = %label,
                error = %e,
                stack_size = stack_size,
                "Failed to spawn handler coroutine"
            );
            return;
        }

        let methods = self.controllers.entry(controller.to_string()).or_default();
        if methods.insert(method.to_string(), tx).is_some() {
            warn!(handler = %label, "Replaced existing handler");
        }
        info!(handler = %label, "Handler registered");
    }

    /// Run `op` for `ctx`, through its around hook when it names one.
    pub fn handle(&self, op: &OperationDescriptor, ctx: &RequestContext) -> Rendered {
        let hook = match op.around_hook.as_deref() {
            None => None,
            Some(name) => match self.hooks.get(name) {
                Some(h) => Some(h.as_ref()),
                None => {
                    error!(
                        request_id = %ctx.request_id,
                        hook = %name,
                        operation = %op.display_id(),
                        "Around hook not registered"
                    );
                    return Rendered::error(500, format!("Around hook \"{name}\" not registered."));
                }
            },
        };
        run_around(hook, ctx, op, || self.invoke(op, ctx))
    }

    /// The invocation closure: resolve, validate input, call, validate output.
    pub fn invoke(&self, op: &OperationDescriptor, ctx: &RequestContext) -> Rendered {
        let Some(methods) = self.controllers.get(&op.controller_name) else {
            warn!(
                request_id = %ctx.request_id,
                controller = %op.controller_name,
                operation = %op.display_id(),
                "Controller not implemented"
            );
            return Rendered::controller_not_implemented();
        };
        let Some(tx) = methods.get(&op.method_name) else {
            warn!(
                request_id = %ctx.request_id,
                controller = %op.controller_name,
                method_name = %op.method_name,
                operation = %op.display_id(),
                "Method not implemented"
            );
            return Rendered::method_not_implemented(op.display_id());
        };

        let outcome = validate_input(op, ctx, self.validator.as_ref());
        if !outcome.result.valid {
            return Rendered::input_invalid(outcome.result.errors);
        }

        let Some(response) = self.call(tx, op, ctx, outcome.input) else {
            return Rendered::handler_not_completed();
        };
        if !response.errors.is_empty() {
            return render(response.errors, None, response.status);
        }
        validate_response(op, response.body, response.status, self.validator.as_ref())
    }

    /// Send the request to the handler coroutine and wait for its completion.
    ///
    /// Returns `None` when the completion was dropped without a response.
    fn call(
        &self,
        tx: &HandlerSender,
        op: &OperationDescriptor,
        ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Option<HandlerResponse> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id: ctx.request_id,
            operation_id: op.operation_id.clone(),
            controller: op.controller_name.clone(),
            method_name: op.method_name.clone(),
            input,
            completion: Completion {
                request_id: ctx.request_id,
                reply_tx,
            },
        };

        info!(
            request_id = %ctx.request_id,
            controller = %op.controller_name,
            method_name = %op.method_name,
            http_method = %op.method,
            route = %op.route_template,
            "Request dispatched to handler"
        );
        let started = Instant::now();

        if tx.send(request).is_err() {
            error!(
                request_id = %ctx.request_id,
                controller = %op.controller_name,
                method_name = %op.method_name,
                "Handler coroutine is gone"
            );
            return None;
        }

        match reply_rx.recv() {
            Ok(response) => {
                info!(
                    request_id = %ctx.request_id,
                    status = response.status,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Handler completed"
                );
                Some(response)
            }
            Err(_) => {
                error!(
                    request_id = %ctx.request_id,
                    controller = %op.controller_name,
                    method_name = %op.method_name,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Handler dropped its completion without responding"
                );
                None
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
