use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output format of the operational telemetry written to stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    #[default]
    Json,
    /// Single-line human readable events.
    Compact,
    /// Multi-line human readable events for interactive debugging.
    Pretty,
}

/// Error raised when a [`LogFormat`] cannot be parsed from text.
pub type LogFormatParseError = strum::ParseError;
