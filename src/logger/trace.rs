//! Bridge from [`Logger`] records onto the `tracing` facade

use super::{Fields, Level, Logger};

/// Forwards records to whatever `tracing` subscriber the application installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, event_id: u32, message: &str, fields: &Fields) {
        match level {
            Level::Debug => tracing::debug!(event_id, fields = %fields, "{message}"),
            Level::Info => tracing::info!(event_id, fields = %fields, "{message}"),
            Level::Warning => tracing::warn!(event_id, fields = %fields, "{message}"),
            Level::Error => tracing::error!(event_id, fields = %fields, "{message}"),
            Level::Fatal => tracing::error!(event_id, fatal = true, fields = %fields, "{message}"),
        }
    }
}
