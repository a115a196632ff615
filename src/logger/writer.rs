//! Log writer module
//!
//! Thread-safe line logger writing to an append-mode file or stdout.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;

use super::format::format_record;
use super::{Fields, Level, Logger};

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Write to file
    File(Mutex<File>),
}

/// Default [`Logger`] implementation.
///
/// Debug records are dropped unless debug output was enabled with
/// [`SimpleLogger::with_debug`].
pub struct SimpleLogger {
    target: LogTarget,
    debug: bool,
}

impl SimpleLogger {
    /// Create a logger writing to `log_file`, or to stdout when `None`
    pub fn new(log_file: Option<&Path>) -> io::Result<Self> {
        let target = match log_file {
            Some(path) => {
                let file = open_log_file(path).map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("error opening log file {}: {e}", path.display()),
                    )
                })?;
                LogTarget::File(Mutex::new(file))
            }
            None => LogTarget::Stdout,
        };
        Ok(Self {
            target,
            debug: false,
        })
    }

    pub const fn stdout() -> Self {
        Self {
            target: LogTarget::Stdout,
            debug: false,
        }
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn write_line(&self, line: &str) {
        match &self.target {
            LogTarget::Stdout => {
                println!("{line}");
            }
            LogTarget::File(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{line}");
                }
            }
        }
    }
}

impl Logger for SimpleLogger {
    fn log(&self, level: Level, event_id: u32, message: &str, fields: &Fields) {
        if level == Level::Debug && !self.debug {
            return;
        }
        let line = format_record(&Local::now(), level, event_id, message, fields);
        self.write_line(&line);
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &Path) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("server.log");

        let logger = SimpleLogger::new(Some(&path)).unwrap();
        logger.info(1, "Starting server", &Fields::new().with("listen", "127.0.0.1:8080"));
        logger.error(11, "encode failed", &Fields::new());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO 0001 Starting server listen=127.0.0.1:8080"));
        assert!(lines[1].ends_with("ERROR 0011 encode failed"));
    }

    #[test]
    fn test_appends_to_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "existing\n").unwrap();

        let logger = SimpleLogger::new(Some(file.path())).unwrap();
        logger.warning(5, "second", &Fields::new());

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.starts_with("existing\n"));
        assert!(contents.contains("WARNING 0005 second"));
    }

    #[test]
    fn test_debug_suppressed_unless_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");

        let quiet = SimpleLogger::new(Some(&path)).unwrap();
        quiet.debug(2, "hidden", &Fields::new());
        let loud = SimpleLogger::new(Some(&path)).unwrap().with_debug(true);
        loud.debug(2, "shown", &Fields::new());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("hidden"));
        assert!(contents.contains("DEBUG 0002 shown"));
    }

    #[test]
    fn test_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a log file
        let result = SimpleLogger::new(Some(dir.path()));
        assert!(result.is_err());
    }
}
