// Functional options
// Each option mutates one setting and may reject its value

use std::path::PathBuf;
use std::sync::Arc;

use super::types::{validate_listen, validate_timeout};
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::server::Server;

/// One configuration step applied by [`Server::new`]
pub type ServerOption = Box<dyn FnOnce(&mut Server) -> Result<()> + Send>;

fn option(f: impl FnOnce(&mut Server) -> Result<()> + Send + 'static) -> ServerOption {
    Box::new(f)
}

pub fn with_logger(logger: Arc<dyn Logger>) -> ServerOption {
    option(move |s| {
        s.set_logger(logger);
        Ok(())
    })
}

pub fn with_listen(listen: impl Into<String>) -> ServerOption {
    let listen = listen.into();
    option(move |s| {
        validate_listen(&listen)?;
        s.config.listen = listen;
        Ok(())
    })
}

/// Sets both the read and write timeout, in seconds
pub fn with_http_timeout(seconds: u64) -> ServerOption {
    option(move |s| {
        validate_timeout("http_timeout", seconds)?;
        s.config.read_timeout = seconds;
        s.config.write_timeout = seconds;
        Ok(())
    })
}

pub fn with_read_timeout(seconds: u64) -> ServerOption {
    option(move |s| {
        validate_timeout("read_timeout", seconds)?;
        s.config.read_timeout = seconds;
        Ok(())
    })
}

pub fn with_write_timeout(seconds: u64) -> ServerOption {
    option(move |s| {
        validate_timeout("write_timeout", seconds)?;
        s.config.write_timeout = seconds;
        Ok(())
    })
}

pub fn with_idle_timeout(seconds: u64) -> ServerOption {
    option(move |s| {
        validate_timeout("idle_timeout", seconds)?;
        s.config.idle_timeout = seconds;
        Ok(())
    })
}

/// 0 disables the limit
pub fn with_max_concurrent(max: usize) -> ServerOption {
    option(move |s| {
        s.config.max_concurrent = max;
        Ok(())
    })
}

pub fn with_log_file(path: impl Into<PathBuf>) -> ServerOption {
    let path = path.into();
    option(move |s| {
        s.config.log_file = non_empty("log_file", path).map(Some)?;
        Ok(())
    })
}

pub fn with_down_file(path: impl Into<PathBuf>) -> ServerOption {
    let path = path.into();
    option(move |s| {
        s.config.down_file = non_empty("down_file", path).map(Some)?;
        Ok(())
    })
}

pub fn with_event_base(base: u32) -> ServerOption {
    option(move |s| {
        s.config.event_base = base;
        Ok(())
    })
}

pub fn with_health_handler(enabled: bool) -> ServerOption {
    option(move |s| {
        s.config.health_handler = enabled;
        Ok(())
    })
}

pub fn with_test_handler(enabled: bool) -> ServerOption {
    option(move |s| {
        s.config.test_handler = enabled;
        Ok(())
    })
}

pub fn with_strict_slash(enabled: bool) -> ServerOption {
    option(move |s| {
        s.config.strict_slash = enabled;
        Ok(())
    })
}

pub fn with_default_headers(enabled: bool) -> ServerOption {
    option(move |s| {
        s.config.default_headers = enabled;
        Ok(())
    })
}

pub fn with_tls(enabled: bool) -> ServerOption {
    option(move |s| {
        s.config.tls = enabled;
        Ok(())
    })
}

pub fn with_tls_cert_file(path: impl Into<PathBuf>) -> ServerOption {
    let path = path.into();
    option(move |s| {
        s.config.tls_cert_file = non_empty("tls_cert_file", path).map(Some)?;
        Ok(())
    })
}

pub fn with_tls_key_file(path: impl Into<PathBuf>) -> ServerOption {
    let path = path.into();
    option(move |s| {
        s.config.tls_key_file = non_empty("tls_key_file", path).map(Some)?;
        Ok(())
    })
}

pub fn with_tls_strong_ciphers(enabled: bool) -> ServerOption {
    option(move |s| {
        s.config.tls_strong_ciphers = enabled;
        Ok(())
    })
}

pub fn with_debug(enabled: bool) -> ServerOption {
    option(move |s| {
        s.config.debug = enabled;
        Ok(())
    })
}

fn non_empty(option: &'static str, path: PathBuf) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_option(option, "path is empty"));
    }
    Ok(path)
}
