//! Error and warning types for quotekit.
//!
//! Provides [`QuoteError`] for fatal errors that stop loading a document,
//! [`ValidationError`] for rejected user input (percentages),
//! [`AdjustError`] for rejected edits of a single price,
//! [`ExtractWarning`] for non-fatal issues that allow best-effort continuation,
//! and [`ExtractResult`] for pairing a value with collected warnings.

use std::fmt;

/// Fatal error types for document loading and detection.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// Error parsing document structure or syntax.
    ParseError(String),
    /// I/O error reading document data.
    IoError(String),
    /// The input bytes are not a format any text source adapter handles.
    UnsupportedFormat(String),
    /// The PDF is encrypted and requires a password to open.
    PasswordRequired,
    /// A configured resource limit was exceeded.
    ResourceLimitExceeded {
        /// Name of the limit that was exceeded (e.g., "max_input_bytes").
        limit_name: String,
        /// The configured limit value.
        limit_value: usize,
        /// The actual value that exceeded the limit.
        actual_value: usize,
    },
    /// A newer document load started while this one was still running.
    ///
    /// Results of the superseded load are discarded.
    Superseded {
        /// Generation of the load that was abandoned.
        generation: u64,
        /// Generation that is current now.
        current: u64,
    },
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteError::ParseError(msg) => write!(f, "parse error: {msg}"),
            QuoteError::IoError(msg) => write!(f, "I/O error: {msg}"),
            QuoteError::UnsupportedFormat(what) => write!(f, "unsupported document format: {what}"),
            QuoteError::PasswordRequired => write!(f, "PDF is encrypted and requires a password"),
            QuoteError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
            } => write!(
                f,
                "resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value})"
            ),
            QuoteError::Superseded {
                generation,
                current,
            } => write!(
                f,
                "document load {generation} was superseded by load {current}"
            ),
            QuoteError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for QuoteError {}

impl From<std::io::Error> for QuoteError {
    fn from(err: std::io::Error) -> Self {
        QuoteError::IoError(err.to_string())
    }
}

/// Rejected percentage input.
///
/// Surfaced to the user as a validation message; the price list it was
/// meant for stays untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The input could not be read as a number at all.
    NotANumber(String),
    /// The input parsed to NaN or an infinity.
    NotFinite,
    /// The percentage would drive prices below zero.
    BelowMinimum {
        /// The rejected percentage.
        value: f64,
        /// The smallest accepted percentage.
        minimum: f64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NotANumber(input) => {
                write!(f, "percentage '{input}' is not a number")
            }
            ValidationError::NotFinite => write!(f, "percentage must be a finite number"),
            ValidationError::BelowMinimum { value, minimum } => {
                write!(f, "percentage {value} is below the minimum of {minimum}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Rejected edit of a single detected price.
#[derive(Debug, Clone, PartialEq)]
pub enum AdjustError {
    /// No price with this id exists in the list.
    UnknownId(String),
    /// The new value is not a finite, non-negative number.
    InvalidValue(f64),
}

impl fmt::Display for AdjustError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustError::UnknownId(id) => write!(f, "no detected price with id '{id}'"),
            AdjustError::InvalidValue(v) => write!(f, "invalid price value: {v}"),
        }
    }
}

impl std::error::Error for AdjustError {}

/// Machine-readable warning code for categorizing extraction issues.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum ExtractWarningCode {
    /// Text extraction failed for a page; it contributes an empty fragment.
    PageExtractionFailed,
    /// A referenced font was not found in page resources.
    MissingFont,
    /// No candidate encoding decoded the input cleanly.
    EncodingFallback,
    /// A price rule could not be compiled and was skipped.
    InvalidRule,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl ExtractWarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            ExtractWarningCode::PageExtractionFailed => "PAGE_EXTRACTION_FAILED",
            ExtractWarningCode::MissingFont => "MISSING_FONT",
            ExtractWarningCode::EncodingFallback => "ENCODING_FALLBACK",
            ExtractWarningCode::InvalidRule => "INVALID_RULE",
            ExtractWarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ExtractWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal warning encountered while extracting text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractWarning {
    /// Machine-readable warning code.
    pub code: ExtractWarningCode,
    /// Human-readable description of the warning.
    pub description: String,
    /// Page number where the warning occurred (0-indexed), if applicable.
    pub page: Option<usize>,
}

impl ExtractWarning {
    /// Create a warning with just a description.
    pub fn new(description: impl Into<String>) -> Self {
        let desc = description.into();
        Self {
            code: ExtractWarningCode::Other(desc.clone()),
            description: desc,
            page: None,
        }
    }

    /// Create a warning with a specific code and description.
    pub fn with_code(code: ExtractWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
        }
    }

    /// Attach page context.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        Ok(())
    }
}

/// A value paired with the warnings collected while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractResult<T> {
    /// The extracted value.
    pub value: T,
    /// Non-fatal issues encountered along the way.
    pub warnings: Vec<ExtractWarning>,
}

impl<T> ExtractResult<T> {
    /// Wrap a value with no warnings.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Wrap a value with the given warnings.
    pub fn with_warnings(value: T, warnings: Vec<ExtractWarning>) -> Self {
        Self { value, warnings }
    }

    /// Whether extraction was clean.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Transform the value, keeping the warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractResult<U> {
        ExtractResult {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
