//! # Dispatcher Module
//!
//! Controller registry and the per-request invocation protocol.
//!
//! ## Overview
//!
//! A controller is a named group of methods. Each method is a handler
//! `Fn(HandlerRequest)` running in its own `may` coroutine, fed through an
//! MPSC channel. For every routed request the dispatcher:
//!
//! 1. resolves the controller (`501 Controller not implemented.` when absent)
//! 2. resolves the method (`501 Method "<operationId>" not implemented.`)
//! 3. runs the parameter pipeline (`400` with the input errors)
//! 4. sends a [`HandlerRequest`] and waits for its [`Completion`]
//! 5. validates the output against the declared response schema (`500` on failure)
//!
//! Waiting happens inside the caller's coroutine, so slow handlers do not
//! block other requests.
//!
//! ## Handler Registration
//!
//! ```rust,ignore
//! use specgate::dispatcher::{Dispatcher, HandlerRequest};
//! use serde_json::json;
//!
//! let mut dispatcher = Dispatcher::new();
//! unsafe {
//!     dispatcher.register_handler("Pet", "list_pets", |req: HandlerRequest| {
//!         let limit = req.input_value("limit").cloned();
//!         req.ok(json!({ "limit": limit }));
//!     });
//! }
//! ```
//!
//! ## Completion
//!
//! The completion may be resolved from another coroutine. Dropping it
//! without resolving, or panicking, renders `500 Handler did not complete.`.
//! A handler that holds its completion forever keeps the request pending;
//! there is no timeout at this layer.

mod core;
mod response;

pub use core::{
    Completion, Dispatcher, HandlerRequest, HandlerResponse, HandlerSender, RequestContext,
};
pub use response::validate_response;
