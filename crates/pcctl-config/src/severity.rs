//! Severity tiers shared by the audit log and its configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Ordered severity of an audit record.
///
/// The derived ordering follows declaration order, so
/// `Debug < Info < Warning < Error < Critical`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    /// Diagnostic detail.
    Debug,
    /// Routine events.
    #[default]
    Info,
    /// Unexpected but recoverable conditions.
    Warning,
    /// Failed operations.
    Error,
    /// Conditions that threaten the service.
    Critical,
}

impl Severity {
    /// Every severity, lowest first.
    pub const ALL: [Self; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Upper-case label used in formatted audit lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Error raised when a [`Severity`] cannot be parsed from text.
pub type SeverityParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("debug", Severity::Debug)]
    #[case("INFO", Severity::Info)]
    #[case("Warning", Severity::Warning)]
    #[case("error", Severity::Error)]
    #[case("critical", Severity::Critical)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: Severity) {
        assert_eq!(input.parse::<Severity>().expect("severity parses"), expected);
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn orders_from_debug_to_critical() {
        let mut shuffled = vec![
            Severity::Error,
            Severity::Debug,
            Severity::Critical,
            Severity::Info,
            Severity::Warning,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Severity::ALL.to_vec());
    }

    #[test]
    fn displays_upper_case_labels() {
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }
}
