//! Bounded ring of the most recent dashboard log entries
//!
//! Entries are numbered on admission and kept newest first. Consumers page
//! through the ring with a low-water mark and are told how many entries
//! aged out before they could see them.

use std::collections::VecDeque;

use chrono::Local;
use serde::Serialize;

use crate::severity::Severity;

/// Number of admitted entries kept in the ring
pub const LOG_CAPACITY: usize = 3;

/// A single dashboard log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Local wall-clock time the entry was created (HH:MM:SS)
    pub time: String,
    /// Entry severity
    pub severity: Severity,
    /// Log message
    pub message: String,
    /// Sequence number, assigned on admission
    pub sequence: Option<u64>,
}

impl LogEntry {
    /// Create a new, not yet admitted, entry stamped with the current time
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            time: Local::now().format("%H:%M:%S").to_string(),
            severity,
            message: message.into(),
            sequence: None,
        }
    }
}

/// Result of filtering the ring from a low-water mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogPage {
    /// Low-water mark to request next time
    pub load_next: u64,
    /// Matching entries, newest first, possibly followed by a dropped notice
    pub entries: Vec<LogEntry>,
}

/// Ring of admitted log entries, newest first
#[derive(Debug, Clone)]
pub struct LogRing {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}

impl LogRing {
    /// Create an empty ring holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            next_sequence: 0,
        }
    }

    /// Number the entry, put it at the front and evict beyond capacity
    ///
    /// Returns the assigned sequence number.
    pub fn admit(&mut self, mut entry: LogEntry) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        entry.sequence = Some(sequence);

        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        sequence
    }

    /// Sequence number the next admitted entry will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Buffered entries, newest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the ring is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Select the entries a consumer has not seen yet
///
/// `entries` must be ordered newest first, as handed out by [`LogRing`].
/// When the oldest returned entry is newer than `low_watermark`, the
/// entries in between were evicted before the consumer polled and a
/// Warning notice with their count is appended.
pub fn filter_from(entries: &[LogEntry], low_watermark: u64) -> LogPage {
    let mut page: Vec<LogEntry> = entries
        .iter()
        .filter(|e| e.sequence.is_some_and(|s| s >= low_watermark))
        .cloned()
        .collect();

    let newest = page.iter().filter_map(|e| e.sequence).max();
    let oldest = page.iter().filter_map(|e| e.sequence).min();
    let load_next = newest.map_or(low_watermark, |s| s + 1);

    if let Some(oldest) = oldest {
        let dropped = oldest - low_watermark;
        if dropped > 0 {
            page.push(LogEntry::new(
                Severity::Warning,
                format!("Dropped {} Log Messages", dropped),
            ));
        }
    }

    LogPage {
        load_next,
        entries: page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(count: u64) -> LogRing {
        let mut ring = LogRing::default();
        for i in 0..count {
            ring.admit(LogEntry::new(Severity::Info, format!("msg {}", i)));
        }
        ring
    }

    fn sequences(entries: &[LogEntry]) -> Vec<Option<u64>> {
        entries.iter().map(|e| e.sequence).collect()
    }

    #[test]
    fn test_admit_assigns_increasing_sequence() {
        let mut ring = LogRing::default();
        assert_eq!(ring.admit(LogEntry::new(Severity::Info, "a")), 0);
        assert_eq!(ring.admit(LogEntry::new(Severity::Info, "b")), 1);
        assert_eq!(ring.next_sequence(), 2);

        let entries = ring.entries();
        assert_eq!(entries[0].message, "b");
        assert_eq!(entries[1].message, "a");
    }

    #[test]
    fn test_ring_capacity() {
        let ring = ring_with(3);
        assert_eq!(ring.len(), 3);

        let ring = ring_with(4);
        assert_eq!(ring.len(), LOG_CAPACITY);
        assert_eq!(sequences(&ring.entries()), vec![Some(3), Some(2), Some(1)]);
        assert_eq!(ring.entries()[2].message, "msg 1");
    }

    #[test]
    fn test_ring_strictly_decreasing() {
        let ring = ring_with(10);
        let seqs: Vec<u64> = ring.entries().iter().filter_map(|e| e.sequence).collect();
        assert!(seqs.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(ring.next_sequence(), 10);
    }

    #[test]
    fn test_filter_from_start_without_drops() {
        let ring = ring_with(2);
        let page = filter_from(&ring.entries(), 0);

        assert_eq!(page.load_next, 2);
        assert_eq!(sequences(&page.entries), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_filter_from_reports_dropped() {
        let ring = ring_with(10);
        let page = filter_from(&ring.entries(), 2);

        assert_eq!(page.load_next, 10);
        assert_eq!(page.entries.len(), 4);
        assert_eq!(
            sequences(&page.entries[..3]),
            vec![Some(9), Some(8), Some(7)]
        );

        let notice = &page.entries[3];
        assert_eq!(notice.severity, Severity::Warning);
        assert_eq!(notice.message, "Dropped 5 Log Messages");
        assert_eq!(notice.sequence, None);
    }

    #[test]
    fn test_filter_from_only_new_entries() {
        let ring = ring_with(5);
        let page = filter_from(&ring.entries(), 4);

        assert_eq!(page.load_next, 5);
        assert_eq!(sequences(&page.entries), vec![Some(4)]);
    }

    #[test]
    fn test_filter_from_nothing_new() {
        let ring = ring_with(5);
        let page = filter_from(&ring.entries(), 5);

        assert_eq!(page.load_next, 5);
        assert!(page.entries.is_empty());

        let empty = filter_from(&[], 7);
        assert_eq!(empty.load_next, 7);
        assert!(empty.entries.is_empty());
    }
}
