use crate::render::Rendered;
use may_minihttp::Response;

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        s if s < 300 => "OK",
        s if s < 400 => "Redirect",
        s if s < 500 => "Client Error",
        _ => "Server Error",
    }
}

fn content_type_header(content_type: &str) -> &'static str {
    match content_type {
        "application/json" => "Content-Type: application/json",
        _ => "Content-Type: text/plain; charset=utf-8",
    }
}

/// Write a [`Rendered`] outcome onto the wire.
pub fn write_rendered(res: &mut Response, rendered: &Rendered) {
    res.status_code(usize::from(rendered.status), status_reason(rendered.status));
    let body = rendered.body_bytes();
    if !body.is_empty() {
        res.header(content_type_header(rendered.content_type()));
    }
    res.body_vec(body);
}
