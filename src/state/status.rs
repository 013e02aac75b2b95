//! Live status record

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

/// Status shown on the dashboard
///
/// The counters are owned by the controller; values supplied by callers
/// are discarded when a status is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Local date of the last update (YYYY-MM-DD)
    pub date: String,
    /// Local time of the last update (HH:MM:SS)
    pub time: String,
    /// Time since startup, human readable
    pub uptime: String,
    /// Number of status updates applied
    pub status_update_count: u64,
    /// Number of accepted configuration updates
    pub config_update_count: u64,
    /// Number of admitted log entries
    pub log_count: u64,
}

impl Status {
    /// Build a status for the current moment relative to `start`
    pub fn capture(start: Instant) -> Self {
        Self::at(Local::now(), start.elapsed())
    }

    /// Build a status for a given wall-clock time and uptime
    pub fn at(now: DateTime<Local>, uptime: Duration) -> Self {
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            // Sub-second precision is noise on a dashboard
            uptime: humantime::format_duration(Duration::from_secs(uptime.as_secs())).to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_at_formats_fields() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let status = Status::at(now, Duration::from_millis(3_723_400));

        assert_eq!(status.date, "2024-03-09");
        assert_eq!(status.time, "07:05:01");
        assert_eq!(status.uptime, "1h 2m 3s");
        assert_eq!(status.status_update_count, 0);
        assert_eq!(status.log_count, 0);
    }

    #[test]
    fn test_status_capture_has_small_uptime() {
        let status = Status::capture(Instant::now());
        assert_eq!(status.uptime, "0s");
        assert_eq!(status.date.len(), 10);
    }
}
