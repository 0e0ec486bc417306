//! # Typed Handlers
//!
//! Controller methods that take a deserialised input struct and return a
//! serialisable output instead of working on [`HandlerRequest`](crate::dispatcher::HandlerRequest)
//! directly. The parameter pipeline has already coerced and validated the
//! input, so conversion failures indicate a mismatch between the struct and
//! the document and are reported as 500.

mod core;

pub use core::{call_typed, TypedHandler, TypedOutcome};
