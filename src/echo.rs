use crate::dispatcher::{Dispatcher, HandlerRequest, RequestContext};
use crate::hooks::{AroundHook, Next};
use crate::render::Rendered;
use crate::spec::OperationDescriptor;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Complete with the validated input object.
pub fn echo_handler(req: HandlerRequest) {
    let HandlerRequest {
        input, completion, ..
    } = req;
    completion.ok(Value::Object(input));
}

/// Register [`echo_handler`] for every `(controller, method)` of `operations`
/// that has no handler yet.
///
/// Lets any document be served without application code; responses are
/// still checked against the declared schemas.
///
/// # Safety
///
/// Same contract as [`Dispatcher::register_handler`].
pub unsafe fn register_echo<'a>(
    dispatcher: &mut Dispatcher,
    operations: impl IntoIterator<Item = &'a OperationDescriptor>,
) -> usize {
    let pairs: BTreeSet<(&str, &str)> = operations
        .into_iter()
        .map(|op| (op.controller_name.as_str(), op.method_name.as_str()))
        .collect();

    let mut registered = 0;
    for (controller, method) in pairs {
        if dispatcher.has_method(controller, method) {
            continue;
        }
        unsafe {
            dispatcher.register_handler(controller, method, echo_handler);
        }
        registered += 1;
    }
    info!(registered = registered, "Echo handlers registered");
    registered
}

/// Around hook that always continues with `next`.
pub struct PassThroughHook;

impl AroundHook for PassThroughHook {
    fn around(&self, next: Next<'_>, _ctx: &RequestContext, _op: &OperationDescriptor) -> Rendered {
        next.run()
    }
}

/// Register [`PassThroughHook`] under every hook name `operations` reference
/// that is not registered yet.
pub fn register_pass_through_hooks<'a>(
    dispatcher: &mut Dispatcher,
    operations: impl IntoIterator<Item = &'a OperationDescriptor>,
) {
    let names: BTreeSet<&str> = operations
        .into_iter()
        .filter_map(|op| op.around_hook.as_deref())
        .collect();
    for name in names {
        if !dispatcher.hooks().contains(name) {
            dispatcher.register_hook(name, Arc::new(PassThroughHook));
        }
    }
}
