use http::method::InvalidMethod;
use http::Method;
use may_minihttp::Request;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info, warn};

/// Transport-independent view of one HTTP request.
///
/// Query and form fields keep every occurrence in arrival order so that
/// `multi` collection parameters can gather all of them; single-value
/// lookups use "last write wins".
#[derive(Debug, Clone, PartialEq)]
pub struct RequestData {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Header names are stored lower-cased
    pub headers: HashMap<String, String>,
    /// Fields of an `application/x-www-form-urlencoded` body
    pub form: Vec<(String, String)>,
    /// Body parsed as JSON, when it is JSON
    pub body: Option<Value>,
}

impl RequestData {
    /// A bodiless request; `target` may carry a query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        RequestData {
            method,
            path,
            query,
            headers: HashMap::new(),
            form: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        last_value(&self.query, name)
    }

    /// Every occurrence of `name` in the query string.
    #[must_use]
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        all_values(&self.query, name)
    }

    #[must_use]
    pub fn form_param(&self, name: &str) -> Option<&str> {
        last_value(&self.form, name)
    }

    #[must_use]
    pub fn form_values(&self, name: &str) -> Vec<&str> {
        all_values(&self.form, name)
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        match self.headers.get(name) {
            Some(v) => Some(v.as_str()),
            None => self
                .headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str),
        }
    }
}

fn last_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rfind(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn all_values<'a>(pairs: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// Decode an `application/x-www-form-urlencoded` string into ordered pairs.
pub fn parse_urlencoded(raw: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Split a request target into its path and decoded query pairs.
pub fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_urlencoded(query)),
        None => (target.to_string(), Vec::new()),
    }
}

fn is_form_content(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|m| m.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Parse the request method token.
///
/// Extension methods (`PURGE`) are kept as is and simply never match a
/// route. A token with characters outside the HTTP token set is rejected.
pub fn parse_method(raw: &str) -> Result<Method, InvalidMethod> {
    Method::from_bytes(raw.as_bytes())
}

/// Read the whole body as UTF-8; an unreadable body counts as empty.
fn read_body<R: Read>(mut reader: R, content_type: &str) -> String {
    let mut raw = String::new();
    if let Err(err) = reader.read_to_string(&mut raw) {
        debug!(
            content_type = %content_type,
            error = %err,
            "Request body is not readable as UTF-8, ignored"
        );
        raw.clear();
    }
    raw
}

/// Convert a `may_minihttp` request into [`RequestData`].
///
/// Form bodies fill `form`; any other non-empty body is kept when it parses
/// as JSON.
///
/// # Errors
///
/// [`InvalidMethod`] when the method token is malformed.
pub fn parse_request(req: Request) -> Result<RequestData, InvalidMethod> {
    let method = parse_method(req.method()).inspect_err(|_| {
        warn!(method = %req.method(), path = %req.path(), "Malformed request method");
    })?;
    let (path, query) = split_target(req.path());

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    debug!(
        header_count = headers.len(),
        query_count = query.len(),
        "Headers and query extracted"
    );

    let content_type = headers.get("content-type").cloned().unwrap_or_default();
    let raw_body = read_body(req.body(), &content_type);
    let size = raw_body.len();

    let mut form = Vec::new();
    let mut body = None;
    if size > 0 {
        if is_form_content(&content_type) {
            form = parse_urlencoded(&raw_body);
        } else {
            body = serde_json::from_str::<Value>(&raw_body).ok();
            if body.is_none() {
                debug!(
                    content_type = %content_type,
                    body_size_bytes = size,
                    "Request body is not JSON, ignored"
                );
            }
        }
    }

    info!(
        method = %method,
        path = %path,
        body_size_bytes = size,
        form_fields = form.len(),
        "HTTP request parsed"
    );

    Ok(RequestData {
        method,
        path,
        query,
        headers,
        form,
        body,
    })
}
