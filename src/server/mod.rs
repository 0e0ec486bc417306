//! HTTP transport on `may_minihttp`: request parsing into [`RequestData`],
//! [`Rendered`](crate::render::Rendered) writing, and the server handle.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_method, parse_request, parse_urlencoded, split_target, RequestData};
pub use response::write_rendered;
pub use service::AppService;
