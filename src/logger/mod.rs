//! Logger module
//!
//! A small capability interface for leveled, event-numbered logging:
//! - [`Logger`] trait with `debug/info/warning/error/fatal`
//! - [`Fields`] ordered key/value pairs attached to a record
//! - [`SimpleLogger`] line logger writing to a file or stdout
//! - [`TracingLogger`] bridge onto the `tracing` facade

mod format;
mod trace;
pub mod writer;

pub use format::format_record;
pub use trace::TracingLogger;
pub use writer::SimpleLogger;

use std::fmt;

/// Event identifiers, offset from the configured event base.
pub mod events {
    pub const STARTING: u32 = 1;
    pub const ROUTE_REGISTERED: u32 = 2;
    pub const SHUTDOWN_REQUESTED: u32 = 3;
    pub const STOPPED: u32 = 4;
    pub const CONNECTION_ERROR: u32 = 5;
    pub const TLS_HANDSHAKE: u32 = 6;
    pub const ACCEPT_ERROR: u32 = 7;
    pub const DUPLICATE_ROUTE: u32 = 8;
    pub const REQUEST: u32 = 10;
    pub const ENCODE_ERROR: u32 = 11;
}

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered key/value pairs attached to a log record.
///
/// Values are rendered with `Display` when inserted; output order is
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a field, builder style
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.0.push((key.into(), value.to_string()));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Leveled logging capability used by the server and request wrapper.
///
/// Implementors only provide [`Logger::log`]; the leveled methods forward to it.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, event_id: u32, message: &str, fields: &Fields);

    fn debug(&self, event_id: u32, message: &str, fields: &Fields) {
        self.log(Level::Debug, event_id, message, fields);
    }

    fn info(&self, event_id: u32, message: &str, fields: &Fields) {
        self.log(Level::Info, event_id, message, fields);
    }

    fn warning(&self, event_id: u32, message: &str, fields: &Fields) {
        self.log(Level::Warning, event_id, message, fields);
    }

    fn error(&self, event_id: u32, message: &str, fields: &Fields) {
        self.log(Level::Error, event_id, message, fields);
    }

    /// Logs at fatal severity. Does not terminate the process.
    fn fatal(&self, event_id: u32, message: &str, fields: &Fields) {
        self.log(Level::Fatal, event_id, message, fields);
    }
}
