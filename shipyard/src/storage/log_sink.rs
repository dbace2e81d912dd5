//! Append-only deployment log

use crate::models::deployment::{DeploymentRecord, LogEntry};

/// Append `entry` to the record's log.
///
/// Timestamps never go backwards within one log: an entry stamped earlier than
/// its predecessor (wall clock adjustment) takes the predecessor's timestamp.
pub fn append(record: &mut DeploymentRecord, mut entry: LogEntry) {
    if let Some(last) = record.logs.last() {
        if entry.timestamp < last.timestamp {
            entry.timestamp = last.timestamp;
        }
    }
    record.updated_at = record.updated_at.max(entry.timestamp);
    record.logs.push(entry);
}

/// Copy of the record's log, oldest first
pub fn entries(record: &DeploymentRecord) -> Vec<LogEntry> {
    record.logs.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::deployment::{DeploymentConfig, LogEntryLevel};
    use chrono::TimeDelta;

    fn record() -> DeploymentRecord {
        let config = DeploymentConfig::parse("netlify", serde_json::Map::new()).unwrap();
        DeploymentRecord::new("p1", config)
    }

    #[test]
    fn test_append_preserves_order() {
        let mut record = record();
        append(&mut record, LogEntry::info("Fetching source"));
        append(&mut record, LogEntry::warn("Slow mirror"));
        append(&mut record, LogEntry::error("Build failed"));

        let levels: Vec<_> = entries(&record).iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![LogEntryLevel::Info, LogEntryLevel::Warn, LogEntryLevel::Error]
        );
    }

    #[test]
    fn test_append_clamps_backwards_timestamps() {
        let mut record = record();
        append(&mut record, LogEntry::info("first"));

        let mut skewed = LogEntry::info("second");
        skewed.timestamp = record.logs[0].timestamp - TimeDelta::seconds(5);
        append(&mut record, skewed);

        assert_eq!(record.logs[1].timestamp, record.logs[0].timestamp);
    }

    #[test]
    fn test_earlier_read_is_prefix_of_later_read() {
        let mut record = record();
        append(&mut record, LogEntry::info("one"));
        let first = entries(&record);
        append(&mut record, LogEntry::info("two"));
        let second = entries(&record);

        assert_eq!(&second[..first.len()], first.as_slice());
    }
}
