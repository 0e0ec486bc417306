//! # Specification Module
//!
//! Loads a Swagger 2.0 document and compiles it into [`OperationDescriptor`]s.
//!
//! - [`load`](load_spec) reads YAML/JSON from a path or URL and expands local `$ref`s
//! - [`directives`] resolves inheritable `x-specgate-controller` / `x-specgate-around`
//! - [`build_operations`] turns every `(path, method)` into a descriptor with a
//!   derived controller method name, a route template and path defaults
//!
//! ```rust,ignore
//! let spec = specgate::spec::load_spec("doc/swagger.yaml")?;
//! let operations = specgate::spec::build_operations(&spec, None)?;
//! ```

mod build;
pub mod directives;
mod error;
mod load;
pub mod naming;
mod types;

pub use build::*;
pub use error::*;
pub use load::*;
pub use types::*;
