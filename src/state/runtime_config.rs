//! Runtime configuration entity
//!
//! The settings that can be edited while the dashboard is running. Updates
//! arrive as raw form fields and are validated field by field; whatever was
//! submitted is kept for display so it can be corrected.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::severity::{self, Severity};

/// Form key holding the minimum log severity
pub const LOG_SEVERITY_KEY: &str = "LogSeverity";

/// Form key holding the status update period in seconds
pub const STATUS_UPDATE_PERIOD_KEY: &str = "StatusUpdatePeriod";

/// Smallest accepted status update period, in seconds
pub const STATUS_UPDATE_MIN_SECS: i64 = 1;

/// Largest accepted status update period, in seconds
pub const STATUS_UPDATE_MAX_SECS: i64 = 60;

/// Raw fields of a configuration update, as decoded from a form
pub type ConfigFields = HashMap<String, Vec<String>>;

/// Validation failures for a configuration update
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// One of the required keys is absent or has no value
    #[error("Missing Entries")]
    MissingFields,

    /// Severity name outside the recognized set
    #[error("Invalid severity got {0}")]
    InvalidSeverity(String),

    /// Period could not be parsed as an integer
    #[error("Could not interpret '{0}' as integer")]
    MalformedPeriod(String),

    /// Period parsed but lies outside the accepted range
    #[error(
        "StatusUpdatePeriod must be in range {} - {} s. Got {0}",
        STATUS_UPDATE_MIN_SECS,
        STATUS_UPDATE_MAX_SECS
    )]
    PeriodOutOfRange(i64),
}

/// Editable runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeConfig {
    /// Last accepted status update period
    #[serde(rename = "status_update_period_secs", serialize_with = "as_secs")]
    pub status_update_period: Duration,
    /// Period exactly as last submitted (sanitized)
    pub status_update_period_string: String,
    /// Last period validation error, empty if none
    pub status_update_period_error: String,
    /// Minimum severity a log entry needs to be admitted
    pub log_severity: String,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(Severity::Trace, Duration::from_secs(1))
    }
}

impl RuntimeConfig {
    /// Create a configuration with the given committed values and no error
    pub fn new(log_severity: Severity, status_update_period: Duration) -> Self {
        let mut config = Self {
            status_update_period,
            status_update_period_string: String::new(),
            status_update_period_error: String::new(),
            log_severity: log_severity.to_string(),
        };
        config.reset();
        config
    }

    /// Apply a configuration update
    ///
    /// Severity is checked first; the sanitized value is committed even when
    /// it is rejected. The period string is likewise committed before it is
    /// parsed, but the period itself only changes when it parses and is in
    /// range.
    pub fn update(&mut self, fields: &ConfigFields) -> Result<(), ConfigError> {
        let (Some(log_severity), Some(period)) = (
            first_value(fields, LOG_SEVERITY_KEY),
            first_value(fields, STATUS_UPDATE_PERIOD_KEY),
        ) else {
            return Err(ConfigError::MissingFields);
        };

        self.log_severity = sanitize(log_severity);
        if !severity::is_valid(&self.log_severity) {
            return Err(ConfigError::InvalidSeverity(self.log_severity.clone()));
        }

        self.status_update_period_string = sanitize(period);
        let secs = match self.status_update_period_string.parse::<i64>() {
            Ok(secs) => {
                self.status_update_period_error.clear();
                secs
            }
            Err(_) => {
                let err = ConfigError::MalformedPeriod(self.status_update_period_string.clone());
                self.status_update_period_error = err.to_string();
                return Err(err);
            }
        };

        if !(STATUS_UPDATE_MIN_SECS..=STATUS_UPDATE_MAX_SECS).contains(&secs) {
            let err = ConfigError::PeriodOutOfRange(secs);
            self.status_update_period_error = err.to_string();
            return Err(err);
        }

        // Range check above guarantees a positive value
        self.status_update_period = Duration::from_secs(secs as u64);
        Ok(())
    }

    /// Drop any pending edit of the period and clear its error
    ///
    /// Severity and the committed period are left alone.
    pub fn reset(&mut self) {
        self.status_update_period_string = self.status_update_period.as_secs().to_string();
        self.status_update_period_error.clear();
    }

    /// Configured minimum severity level
    pub fn min_level(&self) -> u8 {
        severity::level_of(&self.log_severity)
    }

    /// Check whether an entry of the given severity would be admitted
    pub fn admits(&self, severity: Severity) -> bool {
        severity.level() >= self.min_level()
    }
}

fn first_value<'a>(fields: &'a ConfigFields, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(|v| v.first()).map(String::as_str)
}

/// Escape characters that are unsafe to echo back into markup
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
