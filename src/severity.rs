//! Log severity scale
//!
//! Total order over the dashboard's log levels, with a reserved level for
//! names that are not recognized.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Level returned for any name outside the recognized set
pub const LEVEL_INVALID: u8 = 4;

/// Severity of a dashboard log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Trace,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// All recognized severities, lowest first
    pub const ALL: [Severity; 4] = [
        Severity::Trace,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
    ];

    /// Get the name used in configuration and display
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "Trace",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }

    /// Numeric level, 0 for Trace up to 3 for Error
    pub fn level(&self) -> u8 {
        match self {
            Severity::Trace => 0,
            Severity::Info => 1,
            Severity::Warning => 2,
            Severity::Error => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown severity name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity '{0}'")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Trace" => Ok(Severity::Trace),
            "Info" => Ok(Severity::Info),
            "Warning" => Ok(Severity::Warning),
            "Error" => Ok(Severity::Error),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// Map a severity name to its level
///
/// Unrecognized names (including different casing) map to [`LEVEL_INVALID`],
/// which sorts above every real severity.
pub fn level_of(name: &str) -> u8 {
    name.parse::<Severity>()
        .map(|s| s.level())
        .unwrap_or(LEVEL_INVALID)
}

/// Check whether a severity name is one of the recognized levels
pub fn is_valid(name: &str) -> bool {
    level_of(name) != LEVEL_INVALID
}
