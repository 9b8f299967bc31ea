//! CDR format dispatch, timestamp window extraction and day segmentation.

pub mod catalog;
pub mod entry;
pub mod extract;
pub mod segment;

pub use catalog::{FormatCatalog, FormatDescriptor, FormatSpec, GatewayType};
pub use entry::LogEntry;
pub use extract::{extract, extract_from_reader, line_timestamp, ExtractStats, Extraction, LineError, TimeWindow};
pub use segment::{is_long_window, segment, Segment, LONG_WINDOW_DAYS};
