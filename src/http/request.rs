//! Request handed to application handlers

use std::net::SocketAddr;

use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

/// Path variables captured by the router, in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'k, 'v> From<matchit::Params<'k, 'v>> for Params {
    fn from(params: matchit::Params<'k, 'v>) -> Self {
        Self(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// An inbound request with its body fully read
#[derive(Debug)]
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: Params,
    remote_addr: SocketAddr,
}

impl Request {
    pub fn new(request: hyper::Request<Bytes>, remote_addr: SocketAddr) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, body, remote_addr)
    }

    pub(crate) fn from_parts(parts: Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        Self {
            parts,
            body,
            params: Params::default(),
            remote_addr,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub const fn method(&self) -> &Method {
        &self.parts.method
    }

    pub const fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value as text; `None` when absent or not visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Named path variable, e.g. `id` for `/test/{id}`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Transport-level peer address
    pub const fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}
