//! Crate error type
//!
//! Configuration and startup failures are returned to the caller of
//! `Server::new` / `Server::start`; per-request failures only close the
//! affected connection.

use std::io;
use std::time::Duration;

/// Errors produced while configuring, starting, serving or stopping a server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid option {option}: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("invalid header {key:?}: {reason}")]
    InvalidHeader { key: String, reason: String },

    #[error("route {name:?} ({method} {pattern}) cannot be registered: {source}")]
    RouteConflict {
        name: String,
        method: String,
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("TLS cert or key file not specified")]
    TlsMaterialMissing,

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("no usable {kind} found in {path}")]
    TlsPem { kind: &'static str, path: String },

    #[error("cannot resolve listen address {0:?}")]
    Resolve(String),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("server is already started")]
    AlreadyStarted,

    #[error("server is not running")]
    NotRunning,

    #[error("server shutdown error: connections still open after {0:?}")]
    ShutdownTimeout(Duration),

    #[error("request body not received within {0:?}")]
    ReadTimeout(Duration),

    #[error("response not produced within {0:?}")]
    WriteTimeout(Duration),

    #[error("handler task failed: {0}")]
    Handler(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Http(#[from] hyper::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl Error {
    pub(crate) fn invalid_option(option: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}
