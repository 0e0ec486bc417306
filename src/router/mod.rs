//! # Router Module
//!
//! Matches `(method, path)` against the route templates produced by the
//! operation compiler.
//!
//! Route templates are the document's path templates with `{name}` tokens
//! rewritten to typed placeholders and the mount prefix prepended:
//!
//! | Template   | Captures                        |
//! |------------|---------------------------------|
//! | `:name`    | up to the next `/` or `.`       |
//! | `#name`    | up to the next `/`              |
//! | `*name`    | the rest of the path            |
//!
//! Each template is compiled once into an anchored regex. Captured values
//! are percent-decoded. When the last placeholder has a declared default it
//! may be omitted from the request and the default is captured instead.
//!
//! ```rust,ignore
//! let router = Router::new(&operations)?;
//! if let Some(m) = router.route(&Method::GET, "/api/pets/7") {
//!     assert_eq!(m.get_path_param("id"), Some("7"));
//! }
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{compile_template, ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
