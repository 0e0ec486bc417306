use crate::dispatcher::RequestContext;
use crate::render::Rendered;
use crate::spec::OperationDescriptor;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Continuation handed to an around hook.
///
/// Runs the rest of the request (parameter pipeline, handler, response
/// validation). Consuming `self` means it can run at most once.
pub struct Next<'a> {
    run: Box<dyn FnOnce() -> Rendered + 'a>,
    produced: &'a RefCell<Option<Rendered>>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        run: impl FnOnce() -> Rendered + 'a,
        produced: &'a RefCell<Option<Rendered>>,
    ) -> Self {
        Next {
            run: Box::new(run),
            produced,
        }
    }

    pub fn run(self) -> Rendered {
        let rendered = (self.run)();
        *self.produced.borrow_mut() = Some(rendered.clone());
        rendered
    }
}

/// Wraps the invocation of an operation.
///
/// A hook either short-circuits by returning its own [`Rendered`] without
/// calling `next`, or calls `next.run()` and returns its result. Returning
/// something else after running `next` is rendered but logged as a warning.
///
/// ```rust,ignore
/// struct RequireKey;
///
/// impl AroundHook for RequireKey {
///     fn around(&self, next: Next<'_>, ctx: &RequestContext, _op: &OperationDescriptor) -> Rendered {
///         if ctx.request.header("x-api-key").is_none() {
///             return Rendered::error(401, "Unauthorized.");
///         }
///         next.run()
///     }
/// }
/// ```
pub trait AroundHook: Send + Sync {
    fn around(&self, next: Next<'_>, ctx: &RequestContext, op: &OperationDescriptor) -> Rendered;
}

/// Named around hooks referenced by `x-specgate-around`.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn AroundHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, hook: Arc<dyn AroundHook>) {
        if self.hooks.insert(name.to_string(), hook).is_some() {
            warn!(hook = %name, "Around hook replaced");
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn AroundHook>> {
        self.hooks.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }
}

/// Run `invoke` through `hook`, or directly when there is none.
pub fn run_around(
    hook: Option<&dyn AroundHook>,
    ctx: &RequestContext,
    op: &OperationDescriptor,
    invoke: impl FnOnce() -> Rendered,
) -> Rendered {
    let Some(hook) = hook else {
        return invoke();
    };

    let produced = RefCell::new(None);
    let rendered = hook.around(Next::new(invoke, &produced), ctx, op);

    match produced.into_inner() {
        None => debug!(
            request_id = %ctx.request_id,
            operation = %op.display_id(),
            status = rendered.status,
            "Around hook short-circuited the request"
        ),
        Some(inner) if inner != rendered => warn!(
            request_id = %ctx.request_id,
            operation = %op.display_id(),
            next_status = inner.status,
            hook_status = rendered.status,
            "Around hook ran next but returned a different response"
        ),
        Some(_) => {}
    }
    rendered
}
