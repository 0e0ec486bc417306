//! # specgate
//!
//! **specgate** turns a [Swagger 2.0](https://swagger.io/specification/v2/)
//! document into a validated request dispatch table running on the `may`
//! coroutine runtime.
//!
//! ## Overview
//!
//! At registration the document is loaded, its local `$ref`s expanded, and
//! every `(path, method)` compiled into an [`OperationDescriptor`]: a route
//! template, the controller and method that serve it, its parameters and
//! response schemas, and an optional around hook. Controller and hook names
//! come from inheritable vendor extensions:
//!
//! ```yaml
//! swagger: "2.0"
//! basePath: /api
//! x-specgate-controller: Pet          # inherited by every operation
//! paths:
//!   /pets:
//!     get:
//!       operationId: listPets         # method name: list_pets
//!       x-specgate-around: auth       # wrapped by the "auth" hook
//!       parameters:
//!         - { name: limit, in: query, type: integer, default: 10 }
//! ```
//!
//! For each request the gateway routes, runs the hook (if any), then the
//! invocation closure:
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Gateway
//!     participant Hook as AroundHook
//!     participant Pipeline as Parameter Pipeline
//!     participant Handler as Handler<br/>(Coroutine)
//!     participant RespVal as Response Validator
//!
//!     Client->>Gateway: GET /api/pets?limit=5
//!     Gateway->>Gateway: route -> OperationDescriptor
//!     Gateway->>Hook: around(next, ctx, op)
//!     Hook->>Pipeline: next.run()
//!     Pipeline->>Pipeline: extract, default, coerce, validate
//!     alt invalid input
//!         Pipeline-->>Client: 400 {valid:false, errors}
//!     end
//!     Pipeline->>Handler: HandlerRequest {input, completion}
//!     Handler->>RespVal: completion.ok(payload)
//!     alt payload violates schema
//!         RespVal-->>Client: 500 {valid:false, errors}
//!     end
//!     RespVal-->>Client: 200 payload
//! ```
//!
//! ## Modules
//!
//! - **[`spec`]** - loading, directive resolution, operation compilation
//! - **[`pipeline`]** - parameter extraction, coercion and validation
//! - **[`dispatcher`]** - controller registry and invocation protocol
//! - **[`hooks`]** - around hooks
//! - **[`router`]** - route template matching
//! - **[`gateway`]** - registration entry point
//! - **[`render`]** - the `render(errors, payload, status)` contract
//! - **[`server`]** - `may_minihttp` transport
//! - **[`typed`]** - serde-typed handlers
//! - **[`validator`]** - JSON-Schema validation service
//!
//! ## Error mapping
//!
//! | Outcome                     | Status |
//! |-----------------------------|--------|
//! | no route                    | 404    |
//! | controller or method absent | 501    |
//! | input invalid               | 400    |
//! | output invalid              | 500    |
//! | completion dropped          | 500    |
//! | otherwise                   | handler status (default 200) |

pub mod cli;
pub mod dispatcher;
pub mod echo;
pub mod gateway;
pub mod hooks;
pub mod ids;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;
pub mod typed;
pub mod validator;

pub use dispatcher::{Completion, Dispatcher, HandlerRequest, RequestContext};
pub use gateway::{Gateway, GatewayConfig};
pub use hooks::{AroundHook, Next};
pub use render::{render, Rendered};
pub use server::RequestData;
pub use spec::{load_spec, CompileError, OperationDescriptor};
pub use validator::{Schema, ValidationError, ValidationResult};
