//! Format catalog: one descriptor per upstream CDR file naming convention.
//!
//! Descriptors are matched against a file's base name in catalog order and the
//! first match wins. Built-in formats come first; formats from config are
//! appended after them.

use std::ops::Range;
use std::path::Path;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Deserialize;

use crate::error::{CdrlogError, Result};

/// `YYYYMMDDhhmmss`, used by the pipe-delimited gateway files and in file names.
pub const LAYOUT_FULL: &str = "%Y%m%d%H%M%S";

/// `YYMMDDhhmmssSSS`, used by the fixed-width SMSC / TS / MMX files.
pub const LAYOUT_SHORT_MILLIS: &str = "%y%m%d%H%M%S%3f";

/// Byte window holding the timestamp in fixed-width records.
pub const FIXED_WIDTH_RANGE: Range<usize> = 100..140;

/// Gateway type written with every log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayType {
    #[default]
    P2p,
    A2p,
}

impl GatewayType {
    pub fn code(self) -> i64 {
        match self {
            GatewayType::P2p => 0,
            GatewayType::A2p => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(GatewayType::P2p),
            1 => Some(GatewayType::A2p),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GatewayType::P2p => "p2p",
            GatewayType::A2p => "a2p",
        }
    }
}

/// Parsing recipe for one file naming convention.
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    pub name: String,
    /// Searched (unanchored) in the base name. An optional `ts` group marks the
    /// 14-digit file timestamp.
    pub pattern: Regex,
    pub separator: String,
    /// Zero-based index of the timestamp field after splitting.
    pub timestamp_field: usize,
    /// When set, lines longer than `end` are cut to this byte range before splitting.
    pub fixed_range: Option<Range<usize>>,
    /// chrono strftime layout of the timestamp field.
    pub layout: String,
    pub gateway: GatewayType,
}

impl FormatDescriptor {
    pub fn new(
        name: &str,
        pattern: &str,
        separator: &str,
        timestamp_field: usize,
        layout: &str,
        gateway: GatewayType,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| CdrlogError::Config(format!("format {}: invalid pattern: {}", name, e)))?;
        if separator.is_empty() {
            return Err(CdrlogError::Config(format!("format {}: empty separator", name)));
        }
        if layout.is_empty() {
            return Err(CdrlogError::Config(format!("format {}: empty layout", name)));
        }

        Ok(Self {
            name: name.to_string(),
            pattern,
            separator: separator.to_string(),
            timestamp_field,
            fixed_range: None,
            layout: layout.to_string(),
            gateway,
        })
    }

    pub fn with_fixed_range(mut self, range: Range<usize>) -> Result<Self> {
        if range.start >= range.end {
            return Err(CdrlogError::Config(format!(
                "format {}: fixed range {}..{} is empty",
                self.name, range.start, range.end
            )));
        }
        self.fixed_range = Some(range);
        Ok(self)
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    /// Timestamp embedded in the file name, if the pattern captures one.
    pub fn file_timestamp(&self, file_name: &str) -> Option<NaiveDateTime> {
        let captures = self.pattern.captures(file_name)?;
        let ts = captures.name("ts")?.as_str();
        NaiveDateTime::parse_from_str(ts, LAYOUT_FULL).ok()
    }
}

/// Format descriptor as written in the `[[formats]]` config tables.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatSpec {
    pub name: String,
    pub pattern: String,
    pub separator: String,
    pub timestamp_field: usize,
    pub layout: String,
    #[serde(default)]
    pub fixed_range: Option<[usize; 2]>,
    #[serde(default)]
    pub gateway: GatewayType,
}

impl FormatSpec {
    pub fn build(&self) -> Result<FormatDescriptor> {
        let descriptor = FormatDescriptor::new(
            &self.name,
            &self.pattern,
            &self.separator,
            self.timestamp_field,
            &self.layout,
            self.gateway,
        )?;
        match self.fixed_range {
            Some([start, end]) => descriptor.with_fixed_range(start..end),
            None => Ok(descriptor),
        }
    }
}

/// Ordered list of format descriptors.
#[derive(Debug, Clone)]
pub struct FormatCatalog {
    formats: Vec<FormatDescriptor>,
}

impl FormatCatalog {
    /// Catalog with the built-in upstream formats.
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for descriptor in builtin_formats() {
            catalog.register(descriptor);
        }
        catalog
    }

    pub fn empty() -> Self {
        Self { formats: Vec::new() }
    }

    /// Built-in formats followed by the configured ones.
    pub fn with_extra(specs: &[FormatSpec]) -> Result<Self> {
        let mut catalog = Self::new();
        for spec in specs {
            catalog.register(spec.build()?);
        }
        Ok(catalog)
    }

    /// Append a descriptor. It only wins for names no earlier entry matches.
    pub fn register(&mut self, descriptor: FormatDescriptor) {
        self.formats.push(descriptor);
    }

    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// Resolve the descriptor for `path` by its base name.
    pub fn dispatch(&self, path: &Path) -> Result<&FormatDescriptor> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.formats
            .iter()
            .find(|f| f.matches(&file_name))
            .ok_or(CdrlogError::UnrecognizedFormat(file_name))
    }
}

impl Default for FormatCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin(
    name: &str,
    pattern: &str,
    separator: &str,
    timestamp_field: usize,
    layout: &str,
    gateway: GatewayType,
    fixed_range: Option<Range<usize>>,
) -> FormatDescriptor {
    FormatDescriptor {
        name: name.to_string(),
        pattern: Regex::new(pattern).expect("Invalid built-in format pattern"),
        separator: separator.to_string(),
        timestamp_field,
        fixed_range,
        layout: layout.to_string(),
        gateway,
    }
}

fn builtin_formats() -> Vec<FormatDescriptor> {
    vec![
        // cdr_a2pgw03a_20220117161852_195
        builtin(
            "a2pgw",
            r"cdr_a2pgw0[0-9][a-z]_(?P<ts>\d{14})_\d{3}",
            "|",
            1,
            LAYOUT_FULL,
            GatewayType::A2p,
            None,
        ),
        // CDR_P2PGW03A_IP37_20220108132921_161
        builtin(
            "p2pgw_class40",
            r"CDR_P2PGW0[0-9][A-Z]_IP\d{2}_(?P<ts>\d{14})_\d{3}",
            "|",
            22,
            LAYOUT_FULL,
            GatewayType::P2p,
            None,
        ),
        // TS04_20211220171812_19.pp
        builtin(
            "ts",
            r"TS\d{2}_(?P<ts>\d{14})_\d{2}\.pp",
            "C",
            1,
            LAYOUT_SHORT_MILLIS,
            GatewayType::P2p,
            Some(FIXED_WIDTH_RANGE),
        ),
        // MMX_20211220155600_1.csv
        builtin(
            "mmx",
            r"MMX_(?P<ts>\d{14})_\d\.csv",
            "C",
            1,
            LAYOUT_SHORT_MILLIS,
            GatewayType::P2p,
            Some(FIXED_WIDTH_RANGE),
        ),
        // CDR_smshub05_20211221091606_111
        builtin(
            "smshub",
            r"CDR_smshub\d{2}_(?P<ts>\d{14})_\d{3}",
            "|",
            22,
            LAYOUT_FULL,
            GatewayType::P2p,
            None,
        ),
        // cdr_00_smsc10a_20211225085228_106
        builtin(
            "smsc",
            r"cdr_\d{2}_smsc\d{2}[abcd]_(?P<ts>\d{14})_\d{3}",
            "C",
            1,
            LAYOUT_SHORT_MILLIS,
            GatewayType::P2p,
            Some(FIXED_WIDTH_RANGE),
        ),
    ]
}
