//! Window extraction: stream a CDR file and reduce its record timestamps to
//! the earliest and latest instant.
//!
//! Lines are read as raw bytes. A line that is too short or whose timestamp
//! field does not parse is counted and skipped; it never fails the file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::catalog::FormatDescriptor;
use crate::error::Result;

/// Earliest and latest timestamp observed in a file. `begin <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(a: NaiveDateTime, b: NaiveDateTime) -> Self {
        if a <= b {
            Self { begin: a, end: b }
        } else {
            Self { begin: b, end: a }
        }
    }

    pub fn at(ts: NaiveDateTime) -> Self {
        Self { begin: ts, end: ts }
    }

    /// Widen the window so it contains `ts`.
    pub fn include(&mut self, ts: NaiveDateTime) {
        if ts < self.begin {
            self.begin = ts;
        }
        if ts > self.end {
            self.end = ts;
        }
    }

    pub fn same_day(&self) -> bool {
        self.begin.date() == self.end.date()
    }
}

/// Why a single line produced no timestamp.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("line has {fields} field(s), timestamp expected at index {index}")]
    Malformed { fields: usize, index: usize },

    #[error("cannot parse '{value}' with layout '{layout}'")]
    Timestamp { value: String, layout: String },
}

/// Per-file line accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub lines: usize,
    pub parsed: usize,
    pub malformed: usize,
    pub unparsable: usize,
}

impl ExtractStats {
    pub fn skipped(&self) -> usize {
        self.malformed + self.unparsable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// `None` when no line yielded a timestamp.
    pub window: Option<TimeWindow>,
    pub stats: ExtractStats,
}

/// Isolate and parse the timestamp of one line.
pub fn line_timestamp(
    line: &[u8],
    descriptor: &FormatDescriptor,
) -> std::result::Result<NaiveDateTime, LineError> {
    let line = match &descriptor.fixed_range {
        Some(range) if line.len() > range.end => &line[range.clone()],
        _ => line,
    };
    let text = String::from_utf8_lossy(line);
    let separator = descriptor.separator.as_str();
    let index = descriptor.timestamp_field;

    let field = text.split(separator).nth(index).ok_or_else(|| LineError::Malformed {
        fields: text.split(separator).count(),
        index,
    })?;

    NaiveDateTime::parse_from_str(field, &descriptor.layout).map_err(|_| LineError::Timestamp {
        value: field.to_string(),
        layout: descriptor.layout.clone(),
    })
}

/// Reduce every line of `reader` to a time window.
///
/// A read error mid-stream ends the scan; the lines read so far still count.
pub fn extract_from_reader<R: BufRead>(mut reader: R, descriptor: &FormatDescriptor) -> Extraction {
    let mut stats = ExtractStats::default();
    let mut window: Option<TimeWindow> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!(
                    "read error after {} line(s) of {} data: {}",
                    stats.lines,
                    descriptor.name,
                    e
                );
                break;
            }
        }
        stats.lines += 1;

        let line = trim_line_end(&buf);
        match line_timestamp(line, descriptor) {
            Ok(ts) => {
                stats.parsed += 1;
                match window.as_mut() {
                    Some(w) => w.include(ts),
                    None => window = Some(TimeWindow::at(ts)),
                }
            }
            Err(LineError::Malformed { .. }) => stats.malformed += 1,
            Err(e @ LineError::Timestamp { .. }) => {
                stats.unparsable += 1;
                log::trace!("line {}: {}", stats.lines, e);
            }
        }
    }

    Extraction { window, stats }
}

/// Open `path` and extract its time window. The file is closed on return.
pub fn extract(path: &Path, descriptor: &FormatDescriptor) -> Result<Extraction> {
    let file = File::open(path)?;
    Ok(extract_from_reader(BufReader::new(file), descriptor))
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::catalog::{FormatCatalog, GatewayType, LAYOUT_FULL};
    use chrono::NaiveDate;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn a2pgw() -> FormatDescriptor {
        FormatCatalog::new()
            .dispatch(Path::new("cdr_a2pgw03a_20220117161852_195"))
            .unwrap()
            .clone()
    }

    fn smsc() -> FormatDescriptor {
        FormatCatalog::new()
            .dispatch(Path::new("cdr_00_smsc10a_20211225085228_106"))
            .unwrap()
            .clone()
    }

    /// Fixed-width record with `stamp` as field 1 of the 100..140 byte window.
    fn fixed_width_line(stamp: &str) -> String {
        let prefix = "x".repeat(100);
        let window = format!("0000C{}C", stamp);
        let window = format!("{:<40}", window);
        format!("{}{}TRAILER", prefix, window)
    }

    #[test]
    fn test_pipe_delimited_min_max() {
        let data = "a|20220117120000|x\n\
                    b|20220117080000|y\n\
                    c|20220117180000|z\n";
        let extraction = extract_from_reader(Cursor::new(data), &a2pgw());
        let window = extraction.window.unwrap();
        assert_eq!(window.begin, ts(2022, 1, 17, 8, 0, 0));
        assert_eq!(window.end, ts(2022, 1, 17, 18, 0, 0));
        assert_eq!(extraction.stats.lines, 3);
        assert_eq!(extraction.stats.parsed, 3);
        assert_eq!(extraction.stats.skipped(), 0);
    }

    #[test]
    fn test_skips_short_and_unparsable_lines() {
        let data = "a|20220117120000\n\
                    no-separator-here\n\
                    b|not-a-time\n\
                    \n\
                    c|20220117130000\r\n";
        let extraction = extract_from_reader(Cursor::new(data), &a2pgw());
        let window = extraction.window.unwrap();
        assert_eq!(window.begin, ts(2022, 1, 17, 12, 0, 0));
        assert_eq!(window.end, ts(2022, 1, 17, 13, 0, 0));
        assert_eq!(extraction.stats.lines, 5);
        assert_eq!(extraction.stats.parsed, 2);
        assert_eq!(extraction.stats.malformed, 2);
        assert_eq!(extraction.stats.unparsable, 1);
    }

    #[test]
    fn test_all_lines_bad_yields_empty_window() {
        let data = "a|garbage\nb|2022-01-17\nshort\n";
        let extraction = extract_from_reader(Cursor::new(data), &a2pgw());
        assert!(extraction.window.is_none());
        assert_eq!(extraction.stats.parsed, 0);
        assert_eq!(extraction.stats.skipped(), 3);
    }

    #[test]
    fn test_empty_input_yields_empty_window() {
        let extraction = extract_from_reader(Cursor::new(""), &a2pgw());
        assert!(extraction.window.is_none());
        assert_eq!(extraction.stats.lines, 0);
    }

    #[test]
    fn test_non_utf8_bytes_do_not_abort() {
        let mut data = b"\xff\xfe|20220117120000\n".to_vec();
        data.extend_from_slice(b"\xc3|bad\xff\n");
        let extraction = extract_from_reader(Cursor::new(data), &a2pgw());
        assert_eq!(extraction.window, Some(TimeWindow::at(ts(2022, 1, 17, 12, 0, 0))));
        assert_eq!(extraction.stats.unparsable, 1);
    }

    #[test]
    fn test_fixed_width_slice() {
        let descriptor = smsc();
        let first = fixed_width_line("220117235959123");
        let second = fixed_width_line("220118000500000");
        assert!(first.len() > 140);

        let data = format!("{}\n{}\n", first, second);
        let window = extract_from_reader(Cursor::new(data), &descriptor).window.unwrap();
        assert_eq!(
            window.begin,
            NaiveDate::from_ymd_opt(2022, 1, 17).unwrap().and_hms_milli_opt(23, 59, 59, 123).unwrap()
        );
        assert_eq!(window.end, ts(2022, 1, 18, 0, 5, 0));
    }

    #[test]
    fn test_fixed_range_ignored_for_short_lines() {
        let descriptor = smsc();
        // Not longer than the range end: split whole
        let line = b"HEADERC220117101010000CTAIL";
        assert_eq!(
            line_timestamp(line, &descriptor).unwrap(),
            ts(2022, 1, 17, 10, 10, 10)
        );
    }

    #[test]
    fn test_fixed_range_exactly_end_length_is_not_sliced() {
        let descriptor = smsc();
        let mut line = "C220117101010000C".to_string();
        line.push_str(&"y".repeat(140 - line.len()));
        assert_eq!(line.len(), 140);
        assert!(line_timestamp(line.as_bytes(), &descriptor).is_ok());
    }

    #[test]
    fn test_line_timestamp_errors() {
        let descriptor = a2pgw();
        assert_eq!(
            line_timestamp(b"only-one-field", &descriptor),
            Err(LineError::Malformed { fields: 1, index: 1 })
        );
        assert_eq!(
            line_timestamp(b"a|2022", &descriptor),
            Err(LineError::Timestamp {
                value: "2022".to_string(),
                layout: LAYOUT_FULL.to_string()
            })
        );
    }

    #[test]
    fn test_deep_field_index() {
        let descriptor = FormatDescriptor::new("deep", "x", "|", 22, LAYOUT_FULL, GatewayType::P2p).unwrap();
        let mut fields: Vec<String> = (0..30).map(|i| format!("f{}", i)).collect();
        fields[22] = "20220301101500".to_string();
        let line = fields.join("|");
        assert_eq!(line_timestamp(line.as_bytes(), &descriptor).unwrap(), ts(2022, 3, 1, 10, 15, 0));

        let short: Vec<String> = (0..22).map(|i| format!("f{}", i)).collect();
        assert!(matches!(
            line_timestamp(short.join("|").as_bytes(), &descriptor),
            Err(LineError::Malformed { fields: 22, index: 22 })
        ));
    }

    #[test]
    fn test_generated_file_round_trip() {
        // Valid lines with a known min and max, written in shuffled order
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cdr_a2pgw01a_20220117000000_001");
        let base = ts(2022, 1, 17, 6, 0, 0);
        let offsets = [37i64, 5, 1440, 0, 999, 12, 1439];
        let lines: Vec<String> = offsets
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let t = base + chrono::Duration::minutes(*m);
                format!("id{}|{}|payload", i, t.format(LAYOUT_FULL))
            })
            .collect();
        std::fs::write(&path, lines.join("\n")).unwrap();

        let extraction = extract(&path, &a2pgw()).unwrap();
        let window = extraction.window.unwrap();
        assert_eq!(window.begin, base);
        assert_eq!(window.end, base + chrono::Duration::minutes(1440));
        assert_eq!(extraction.stats.parsed, offsets.len());
    }

    #[test]
    fn test_extract_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = extract(&temp_dir.path().join("gone"), &a2pgw()).unwrap_err();
        assert!(matches!(err, crate::error::CdrlogError::Io(_)));
    }

    #[test]
    fn test_time_window_ordering() {
        let a = ts(2022, 1, 2, 0, 0, 0);
        let b = ts(2022, 1, 1, 0, 0, 0);
        let window = TimeWindow::new(a, b);
        assert_eq!(window.begin, b);
        assert_eq!(window.end, a);
        assert!(!window.same_day());
        assert!(TimeWindow::at(a).same_day());
    }
}
