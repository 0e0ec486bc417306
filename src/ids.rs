use crate::server::RequestData;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Header carrying a caller-supplied correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation id, a ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse the caller's `X-Request-Id` when it is a valid ULID.
    pub fn for_request(request: &RequestData) -> Self {
        request
            .header(REQUEST_ID_HEADER)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s.trim()).map(RequestId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_caller_id_is_reused() {
        let id = RequestId::new();
        let req = RequestData::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(RequestId::for_request(&req), id);
    }

    #[test]
    fn test_invalid_caller_id_is_replaced() {
        let req = RequestData::new(Method::GET, "/").with_header("X-Request-Id", "not-a-ulid");
        let id = RequestId::for_request(&req);
        assert_eq!(id.to_string().len(), 26);
    }
}
