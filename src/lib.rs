//! wrapsrv - a small, configurable HTTP/HTTPS server wrapper.
//!
//! Applications register [`Route`]s whose handlers return an [`Envelope`];
//! the server takes care of routing, JSON encoding, response headers, one log
//! record per request, health reporting, a concurrency cap, TLS and graceful
//! shutdown.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wrapsrv::{with_listen, Envelope, Request, Route, Server};
//!
//! async fn hello(_request: Request) -> Envelope {
//!     Envelope::ok().with_details("hello")
//! }
//!
//! # async fn run() -> wrapsrv::Result<()> {
//! let mut server = Server::new(vec![with_listen("127.0.0.1:8080")])?;
//! server.add_route(Route::get("hello", "/hello", hello));
//! let server = Arc::new(server);
//! server.start().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use crate::config::{
    with_debug, with_default_headers, with_down_file, with_event_base, with_health_handler,
    with_http_timeout, with_idle_timeout, with_listen, with_log_file, with_logger,
    with_max_concurrent, with_read_timeout, with_strict_slash, with_test_handler, with_tls,
    with_tls_cert_file, with_tls_key_file, with_tls_strong_ciphers, with_write_timeout,
    ServerConfig, ServerOption,
};
pub use crate::error::{Error, Result};
pub use crate::http::{Envelope, Params, Request};
pub use crate::logger::{Fields, Level, Logger, SimpleLogger, TracingLogger};
pub use crate::routing::{Handler, Route, Routes};
pub use crate::server::{Server, SHUTDOWN_GRACE};
