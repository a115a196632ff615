// Configuration types module
// Server tunables with their defaults

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// All server tunables.
///
/// Fields are only read when `start` runs; changing them afterwards has no
/// effect on a running server.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port`, `[v6]:port` or `:port`
    pub listen: String,
    /// Seconds allowed for reading a request body (and the TLS handshake)
    pub read_timeout: u64,
    /// Seconds allowed for producing a response
    pub write_timeout: u64,
    /// Seconds a kept-alive connection may wait for its next request
    pub idle_timeout: u64,
    /// Concurrently accepted connections, 0 = unlimited
    pub max_concurrent: usize,
    /// Log file for the default logger, stdout when unset
    pub log_file: Option<PathBuf>,
    /// Health reports "down" while this file exists
    pub down_file: Option<PathBuf>,
    /// Offset added to every log event id
    pub event_base: u32,
    pub health_handler: bool,
    pub test_handler: bool,
    pub strict_slash: bool,
    pub default_headers: bool,
    pub tls: bool,
    pub tls_cert_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,
    pub tls_strong_ciphers: bool,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            read_timeout: 60,
            write_timeout: 60,
            idle_timeout: 60,
            max_concurrent: 100,
            log_file: None,
            down_file: None,
            event_base: 0,
            health_handler: true,
            test_handler: false,
            strict_slash: false,
            default_headers: true,
            tls: false,
            tls_cert_file: None,
            tls_key_file: None,
            tls_strong_ciphers: true,
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Check values that options would have rejected
    pub fn validate(&self) -> Result<()> {
        validate_listen(&self.listen)?;
        validate_timeout("read_timeout", self.read_timeout)?;
        validate_timeout("write_timeout", self.write_timeout)?;
        validate_timeout("idle_timeout", self.idle_timeout)?;
        Ok(())
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub const fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }
}

pub(crate) fn validate_listen(listen: &str) -> Result<()> {
    match listen.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(Error::invalid_option(
            "listen",
            format!("{listen:?} is not host:port"),
        )),
    }
}

pub(crate) fn validate_timeout(option: &'static str, seconds: u64) -> Result<()> {
    if seconds == 0 {
        return Err(Error::invalid_option(option, "must be at least one second"));
    }
    Ok(())
}
