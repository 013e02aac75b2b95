//! Dashboard state
//!
//! The values owned by the state controller: live status, runtime
//! configuration and the recent-log ring, plus the snapshot handed out to
//! readers.

pub mod log_ring;
pub mod runtime_config;
pub mod status;

pub use log_ring::{filter_from, LogEntry, LogPage, LogRing, LOG_CAPACITY};
pub use runtime_config::{
    sanitize, ConfigError, ConfigFields, RuntimeConfig, LOG_SEVERITY_KEY, STATUS_UPDATE_PERIOD_KEY,
};
pub use status::Status;

use serde::Serialize;

/// Owned copy of the controller state at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub status: Status,
    pub config: RuntimeConfig,
    /// Buffered log entries, newest first
    pub logs: Vec<LogEntry>,
}

impl Snapshot {
    /// Page the snapshot's log entries from a low-water mark
    pub fn filter_logs_from(&self, low_watermark: u64) -> LogPage {
        filter_from(&self.logs, low_watermark)
    }
}
