use crate::dispatcher::{Dispatcher, HandlerRequest};
use crate::validator::ValidationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

/// Output of a typed handler together with its status.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedOutcome<T> {
    pub status: u16,
    pub body: T,
}

impl<T> TypedOutcome<T> {
    pub fn ok(body: T) -> Self {
        TypedOutcome { status: 200, body }
    }

    pub fn with_status(body: T, status: u16) -> Self {
        TypedOutcome { status, body }
    }
}

/// A controller method working on typed input and output.
///
/// `Input` is deserialised from the validated input object, so its field
/// names are the parameter names.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct ListPets { limit: i64 }
///
/// struct ListPetsHandler;
///
/// impl TypedHandler for ListPetsHandler {
///     type Input = ListPets;
///     type Output = Vec<Pet>;
///     fn handle(&self, input: ListPets) -> TypedOutcome<Vec<Pet>> {
///         TypedOutcome::ok(store::pets(input.limit))
///     }
/// }
/// ```
pub trait TypedHandler: Send + 'static {
    type Input: DeserializeOwned;
    type Output: Serialize;

    fn handle(&self, input: Self::Input) -> TypedOutcome<Self::Output>;
}

/// Run a typed handler against one raw request.
///
/// Input that does not deserialise, or output that does not serialise,
/// fails the request with a 500 envelope.
pub fn call_typed<H: TypedHandler>(handler: &H, req: HandlerRequest) {
    let HandlerRequest {
        request_id,
        controller,
        method_name,
        input,
        completion,
        ..
    } = req;

    let typed_input = match serde_json::from_value::<H::Input>(Value::Object(input)) {
        Ok(v) => v,
        Err(e) => {
            error!(
                request_id = %request_id,
                controller = %controller,
                method_name = %method_name,
                error = %e,
                "Typed input conversion failed"
            );
            completion.fail(500, vec![ValidationError::new(e.to_string(), "/")]);
            return;
        }
    };

    let outcome = handler.handle(typed_input);
    match serde_json::to_value(outcome.body) {
        Ok(body) => completion.complete(body, outcome.status),
        Err(e) => {
            error!(
                request_id = %request_id,
                controller = %controller,
                method_name = %method_name,
                error = %e,
                "Typed output serialisation failed"
            );
            completion.fail(500, vec![ValidationError::new(e.to_string(), "/")]);
        }
    }
}

impl Dispatcher {
    /// Register a [`TypedHandler`] as `controller#method`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Dispatcher::register_handler`].
    pub unsafe fn register_typed<H: TypedHandler>(&mut self, controller: &str, method: &str, handler: H) {
        unsafe {
            self.register_handler(controller, method, move |req| call_typed(&handler, req));
        }
    }
}
