// ⚠️ Import Errors - one taxonomy for every pipeline stage
//
// Row-level problems never surface here: they are logged and the row is skipped.
// Everything below is fatal for the file or region being processed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug)]
pub enum ImportError {
    /// Database connectivity or transaction failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Malformed CSV stream (not a single bad row)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Expected source file or directory is absent
    #[error("Source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Unknown region code: {0}")]
    UnknownRegion(String),

    /// A column the stage cannot work without was not detected in the header row
    #[error("Column '{column}' not found in {}", .file.display())]
    MissingColumn { file: PathBuf, column: String },

    /// Row that could not be interpreted at all
    #[error("Line {line}: {message}")]
    Row { line: u64, message: String },
}

impl ImportError {
    /// Errors that only mean "skip this stage" rather than "this run failed"
    pub fn is_skippable(&self) -> bool {
        matches!(self, ImportError::MissingSource(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_is_skippable() {
        let err = ImportError::MissingSource(PathBuf::from("data/ojf_data"));
        assert!(err.is_skippable());
        assert_eq!(err.to_string(), "Source not found: data/ojf_data");
    }

    #[test]
    fn test_database_error_is_fatal() {
        let err = ImportError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_skippable());
        assert!(err.to_string().starts_with("Database error"));
    }

    #[test]
    fn test_missing_column_message() {
        let err = ImportError::MissingColumn {
            file: PathBuf::from("ojf.csv"),
            column: "houseguid".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'houseguid' not found in ojf.csv");
    }
}
