pub mod config;
pub mod error;
pub mod cdr;
pub mod db;
pub mod ingest;
pub mod watch;

pub use config::Config;
pub use error::{CdrlogError, Result};
pub use cdr::{FormatCatalog, FormatDescriptor, LogEntry, Segment, TimeWindow};
pub use ingest::{process_file, reconcile};
