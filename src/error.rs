use thiserror::Error;

/// Main error type for cdrlog
#[derive(Error, Debug)]
pub enum CdrlogError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No catalog pattern matched the file name
    #[error("Unrecognized CDR format: {0}")]
    UnrecognizedFormat(String),

    /// The loading log rejected a write, or the store task failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A watch could not be registered, or the watcher thread stopped
    #[error("Watch error: {0}")]
    Watch(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CdrlogError {
    /// True when an already extracted result could not be stored.
    pub fn is_persistence(&self) -> bool {
        matches!(self, CdrlogError::Database(_) | CdrlogError::Persistence(_))
    }
}

/// Convenient Result type using CdrlogError
pub type Result<T> = std::result::Result<T, CdrlogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CdrlogError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: CdrlogError = rusqlite_err.into();
        assert!(matches!(err, CdrlogError::Database(_)));
        assert!(err.is_persistence());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CdrlogError = io_err.into();
        assert!(matches!(err, CdrlogError::Io(_)));
        assert!(!err.is_persistence());
    }

    #[test]
    fn test_unrecognized_format_is_not_persistence() {
        let err = CdrlogError::UnrecognizedFormat("readme.txt".to_string());
        assert!(err.to_string().contains("readme.txt"));
        assert!(!err.is_persistence());
    }
}
