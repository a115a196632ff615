//! HTTP response building module
//!
//! Turns encoded envelopes into transport responses and builds the few
//! non-envelope responses the router needs.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};

/// Headers that make the JSON envelope explicit; they win over defaults
pub const JSON_HEADERS: [(HeaderName, &str); 4] = [
    (header::CONTENT_TYPE, "application/json; charset=UTF-8"),
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "-1"),
];

/// Default headers added when the default-headers toggle is on
pub const DEFAULT_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// Overwrite `headers` with the JSON envelope headers
pub fn apply_json_headers(headers: &mut HeaderMap) {
    for (name, value) in JSON_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Build a response from an already encoded body
pub fn build_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Build 301 redirect response (strict-slash canonicalisation)
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    let Ok(value) = HeaderValue::from_str(location) else {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::BAD_REQUEST;
        return response;
    };
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, value);
    build_response(StatusCode::MOVED_PERMANENTLY, headers, Bytes::new())
}
