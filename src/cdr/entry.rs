use chrono::{DateTime, NaiveDateTime, Utc};

use super::catalog::GatewayType;
use super::segment::Segment;

/// One loading-log row: a single day segment of a processed CDR file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub file_name: String,
    /// Directory the file was read from.
    pub file_dir: String,
    /// Timestamp embedded in the file name, when the format carries one.
    pub file_time: Option<NaiveDateTime>,
    pub gateway: GatewayType,
    pub segment: Segment,
    pub logged_at: DateTime<Utc>,
}

impl LogEntry {
    /// Build one entry per segment, all stamped with the same `logged_at`.
    pub fn for_segments(
        file_name: &str,
        file_dir: &str,
        file_time: Option<NaiveDateTime>,
        gateway: GatewayType,
        segments: &[Segment],
        logged_at: DateTime<Utc>,
    ) -> Vec<LogEntry> {
        segments
            .iter()
            .map(|segment| LogEntry {
                file_name: file_name.to_string(),
                file_dir: file_dir.to_string(),
                file_time,
                gateway,
                segment: *segment,
                logged_at,
            })
            .collect()
    }
}
