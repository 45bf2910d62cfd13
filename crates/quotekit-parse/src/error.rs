//! Error types for the text source adapters.
//!
//! Uses [`thiserror`] for error derivation. Provides [`BackendError`] that
//! wraps adapter-specific errors and converts them to [`QuoteError`].

use quotekit_core::QuoteError;
use thiserror::Error;

/// Error type for text source adapter operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from PDF parsing (structure, syntax, object resolution).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error reading document data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error during content stream interpretation.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed or unreadable spreadsheet.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] QuoteError),
}

impl From<lopdf::Error> for BackendError {
    fn from(err: lopdf::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

impl From<BackendError> for QuoteError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) | BackendError::Interpreter(msg) => {
                QuoteError::ParseError(msg)
            }
            BackendError::Io(e) => QuoteError::IoError(e.to_string()),
            BackendError::Csv(e) => QuoteError::ParseError(format!("CSV: {e}")),
            BackendError::Spreadsheet(msg) => QuoteError::ParseError(format!("spreadsheet: {msg}")),
            BackendError::Core(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_parse() {
        let err = BackendError::Parse("invalid xref table".to_string());
        assert_eq!(err.to_string(), "PDF parse error: invalid xref table");
    }

    #[test]
    fn backend_error_io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BackendError = io_err.into();
        assert!(matches!(err, BackendError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn interpreter_error_becomes_parse_error() {
        let backend = BackendError::Interpreter("stack underflow".to_string());
        let err: QuoteError = backend.into();
        assert_eq!(err, QuoteError::ParseError("stack underflow".to_string()));
    }

    #[test]
    fn core_error_passes_through() {
        let backend = BackendError::Core(QuoteError::PasswordRequired);
        let err: QuoteError = backend.into();
        assert_eq!(err, QuoteError::PasswordRequired);
    }

    #[test]
    fn spreadsheet_error_message() {
        let err: QuoteError = BackendError::Spreadsheet("no sheets".to_string()).into();
        assert!(err.to_string().contains("no sheets"));
    }
}
