//! Log line format
//!
//! `YYYY/MM/DD HH:MM:SS LEVEL EEEE message key=value ...`
//! The event id is zero-padded to four digits.

use chrono::{DateTime, Local};

use super::{Fields, Level};

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Render one record as a single log line (without trailing newline)
pub fn format_record(
    time: &DateTime<Local>,
    level: Level,
    event_id: u32,
    message: &str,
    fields: &Fields,
) -> String {
    let mut line = format!(
        "{} {} {event_id:04} {message}",
        time.format(TIME_FORMAT),
        level.as_str()
    );
    if !fields.is_empty() {
        line.push(' ');
        line.push_str(&fields.to_string());
    }
    line
}
