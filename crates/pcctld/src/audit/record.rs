//! Immutable audit records and their line format.

use std::fmt;

use time::OffsetDateTime;
use time::macros::format_description;

use pcctl_config::Severity;

/// One accepted audit entry.
///
/// Records are created under the audit lock and never mutated afterwards. The
/// [`Display`](fmt::Display) rendering is the exact line written to every sink:
/// `[YYYY-MM-DD HH:MM:SS][LEVEL] message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    timestamp: OffsetDateTime,
    level: Severity,
    message: String,
}

impl LogRecord {
    pub(super) fn new(timestamp: OffsetDateTime, level: Severity, message: String) -> Self {
        Self {
            timestamp,
            level,
            message,
        }
    }

    /// Moment the record was accepted, in the log's local offset.
    #[must_use]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Severity of the record.
    #[must_use]
    pub fn level(&self) -> Severity {
        self.level
    }

    /// Message text without the timestamp and level prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self
            .timestamp
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(formatter, "[{stamp}][{}] {}", self.level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn renders_bracketed_line() {
        let record = LogRecord::new(
            datetime!(2025-08-26 09:05:03 UTC),
            Severity::Warning,
            "disk almost full".to_owned(),
        );
        assert_eq!(
            record.to_string(),
            "[2025-08-26 09:05:03][WARNING] disk almost full"
        );
    }

    #[test]
    fn renders_in_the_record_offset() {
        let record = LogRecord::new(
            datetime!(2024-12-31 23:59:59 UTC).to_offset(offset!(+2)),
            Severity::Critical,
            "rollover".to_owned(),
        );
        assert_eq!(record.to_string(), "[2025-01-01 01:59:59][CRITICAL] rollover");
    }
}
