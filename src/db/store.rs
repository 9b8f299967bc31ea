//! Loading-log persistence: the store the ingestion pipeline appends to.

use std::collections::HashSet;
use std::path::{Path, MAIN_SEPARATOR};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::params;

use super::Db;
use crate::cdr::{GatewayType, LogEntry, Segment};
use crate::error::{CdrlogError, Result};

/// Text layout of timestamps in the loading log.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Append-only sink for loading-log entries.
///
/// Implementations must accept concurrent calls.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Base names of files already logged from `root` or any directory below it.
    async fn known_file_names(&self, root: &Path) -> Result<HashSet<String>>;

    /// Persist all entries of one file as a single unit.
    async fn append(&self, entries: &[LogEntry]) -> Result<()>;
}

/// Files and segments logged per day and gateway type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub day: NaiveDate,
    pub gateway: GatewayType,
    pub files: i64,
    pub segments: i64,
}

fn format_time(ts: &NaiveDateTime) -> String {
    ts.format(TIME_FORMAT).to_string()
}

fn parse_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| CdrlogError::InvalidInput(format!("stored timestamp '{}': {}", value, e)))
}

fn dir_prefix(root: &Path) -> (String, String) {
    let dir = root.to_string_lossy().trim_end_matches(MAIN_SEPARATOR).to_string();
    let prefix = format!("{}{}", dir, MAIN_SEPARATOR);
    (dir, prefix)
}

#[async_trait]
impl LogStore for Db {
    async fn known_file_names(&self, root: &Path) -> Result<HashSet<String>> {
        let (dir, prefix) = dir_prefix(root);
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT file_name FROM cdr_loading_log \
                 WHERE file_dir = ?1 OR substr(file_dir, 1, length(?2)) = ?2",
            )?;
            let rows = stmt.query_map(params![dir, prefix], |row| row.get::<_, String>(0))?;
            let mut names = HashSet::new();
            for row in rows {
                names.insert(row?);
            }
            Ok::<HashSet<String>, CdrlogError>(names)
        })
        .await
    }

    async fn append(&self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let entries = entries.to_vec();

        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO cdr_loading_log (
                        gateway_type, file_name, file_dir, file_time,
                        begin_time, end_time, segment, logged_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                )?;
                for entry in &entries {
                    stmt.execute(params![
                        entry.gateway.code(),
                        entry.file_name,
                        entry.file_dir,
                        entry.file_time.as_ref().map(format_time),
                        format_time(&entry.segment.begin),
                        format_time(&entry.segment.end),
                        entry.segment.sequence,
                        entry.logged_at.to_rfc3339(),
                    ])?;
                }
            }
            tx.commit()?;
            Ok::<(), CdrlogError>(())
        })
        .await
    }
}

/// All logged segments of `file_name`, in insertion order.
pub async fn entries_for_file(db: &Db, file_name: &str) -> Result<Vec<LogEntry>> {
    let file_name = file_name.to_string();
    let rows = db
        .with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT gateway_type, file_name, file_dir, file_time, begin_time, end_time, segment, logged_at \
                 FROM cdr_loading_log WHERE file_name = ?1 ORDER BY log_id",
            )?;
            let rows = stmt.query_map(params![file_name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok::<Vec<_>, CdrlogError>(out)
        })
        .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for (gateway, file_name, file_dir, file_time, begin, end, sequence, logged_at) in rows {
        let gateway = GatewayType::from_code(gateway)
            .ok_or_else(|| CdrlogError::InvalidInput(format!("unknown gateway type {}", gateway)))?;
        let logged_at = DateTime::parse_from_rfc3339(&logged_at)
            .map_err(|e| CdrlogError::InvalidInput(format!("stored logged_at '{}': {}", logged_at, e)))?
            .with_timezone(&Utc);
        entries.push(LogEntry {
            file_name,
            file_dir,
            file_time: file_time.as_deref().map(parse_time).transpose()?,
            gateway,
            segment: Segment {
                sequence,
                begin: parse_time(&begin)?,
                end: parse_time(&end)?,
            },
            logged_at,
        });
    }
    Ok(entries)
}

/// Per-day, per-gateway counts for segments beginning on or after `since`.
pub async fn daily_summary(db: &Db, since: NaiveDate) -> Result<Vec<DailySummary>> {
    let since = since.format("%Y-%m-%d").to_string();
    let rows = db
        .with_connection(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT substr(begin_time, 1, 10) AS day,
                       gateway_type,
                       COUNT(DISTINCT file_dir || '/' || file_name) AS files,
                       COUNT(*) AS segments
                FROM cdr_loading_log
                WHERE begin_time >= ?1
                GROUP BY day, gateway_type
                ORDER BY day, gateway_type
                "#,
            )?;
            let rows = stmt.query_map(params![since], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok::<Vec<_>, CdrlogError>(out)
        })
        .await?;

    rows.into_iter()
        .map(|(day, gateway, files, segments)| {
            let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map_err(|e| CdrlogError::InvalidInput(format!("stored day '{}': {}", day, e)))?;
            let gateway = GatewayType::from_code(gateway)
                .ok_or_else(|| CdrlogError::InvalidInput(format!("unknown gateway type {}", gateway)))?;
            Ok(DailySummary { day, gateway, files, segments })
        })
        .collect()
}
