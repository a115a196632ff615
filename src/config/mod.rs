// Configuration module entry point
// Server settings, their defaults, file/env loading and functional options

mod options;
mod types;

pub use options::{
    with_debug, with_default_headers, with_down_file, with_event_base, with_health_handler,
    with_http_timeout, with_idle_timeout, with_listen, with_log_file, with_logger,
    with_max_concurrent, with_read_timeout, with_strict_slash, with_test_handler, with_tls,
    with_tls_cert_file, with_tls_key_file, with_tls_strong_ciphers, with_write_timeout,
    ServerOption,
};
pub use types::ServerConfig;

/// Environment variable prefix, e.g. `WRAPSRV_LISTEN`
pub const ENV_PREFIX: &str = "WRAPSRV";

impl ServerConfig {
    /// Load configuration from an optional file, then `WRAPSRV_*` environment
    /// variables. Unset keys keep their defaults.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        settings.try_deserialize()
    }
}
