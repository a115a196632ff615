//! Routing module
//!
//! Route registry types and the method/pattern router built from them.

pub mod router;

pub use router::{Lookup, Router};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hyper::Method;

use crate::http::{Envelope, Request};

/// Boxed future returned by [`Handler::call`]
pub type HandlerFuture = Pin<Box<dyn Future<Output = Envelope> + Send + 'static>>;

/// Application-level handler: takes a request, returns an envelope.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = Envelope>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Envelope> + Send + 'static,
{
    fn call(&self, request: Request) -> HandlerFuture {
        Box::pin(self(request))
    }
}

/// A (name, method, pattern, handler) binding
#[derive(Clone)]
pub struct Route {
    pub name: String,
    pub method: Method,
    pub pattern: String,
    pub handler: Arc<dyn Handler>,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        method: Method,
        pattern: impl Into<String>,
        handler: impl Handler,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            pattern: pattern.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn get(name: impl Into<String>, pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(name, Method::GET, pattern, handler)
    }

    pub fn post(name: impl Into<String>, pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(name, Method::POST, pattern, handler)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Ordered route collection
pub type Routes = Vec<Route>;
