//! Log format selection for the executor's stderr stream.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How log events are rendered on stderr.
///
/// Stdout carries the response protocol, so neither format ever touches it.
/// Parsing ignores ASCII case, so `--log-format COMPACT` is accepted.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for the log collector attached to the
    /// executor's container.
    #[default]
    Json,
    /// Terse human-readable lines for local runs.
    Compact,
}

/// Error returned when `--log-format` names an unknown format.
pub type LogFormatParseError = strum::ParseError;
