//! JSON response envelope
//!
//! Every handler returns an [`Envelope`]; it is serialized as
//! `{"status":..,"code":..,"details"?:..,"data"?:..}` with empty optional
//! fields omitted.

use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform response returned by every handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Text status, e.g. "ok", "error", "down"
    pub status: String,
    /// HTTP status code, also written as the transport status
    pub code: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Extra response headers, applied after the default headers
    #[serde(skip)]
    pub headers: HeaderMap,
}

impl Envelope {
    pub fn new(status: impl Into<String>, code: u16) -> Self {
        Self {
            status: status.into(),
            code,
            ..Self::default()
        }
    }

    /// `"ok"` with 200
    pub fn ok() -> Self {
        Self::new("ok", StatusCode::OK.as_u16())
    }

    /// `"error"` with the given code and details
    pub fn error(code: StatusCode, details: impl Into<String>) -> Self {
        Self::new("error", code.as_u16()).with_details(details)
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach any serializable payload
    pub fn try_with_data<T: Serialize>(self, data: &T) -> serde_json::Result<Self> {
        Ok(self.with_data(serde_json::to_value(data)?))
    }

    /// Set a response header; overrides a configured default header of the same name
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}
