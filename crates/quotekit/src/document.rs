//! Loaded documents and input format detection.

use std::fmt;

use quotekit_core::{ExtractResult, ExtractWarning, QuoteError, TextFragment};
use quotekit_parse::{ExtractMode, PdfSource, csv_to_text, decode_best, is_rtf, strip_rtf};

/// Input formats with a text source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DocumentFormat {
    Pdf,
    Rtf,
    Csv,
    Xlsx,
    PlainText,
}

/// The PDF header may follow some leading junk.
const PDF_HEADER_WINDOW: usize = 1024;

impl DocumentFormat {
    /// Detect the format from the leading bytes, falling back to the file
    /// extension for formats without a signature.
    ///
    /// # Errors
    ///
    /// [`QuoteError::UnsupportedFormat`] for binary containers that are not
    /// a readable workbook (e.g. legacy `.xls`, or XLSX without the
    /// `spreadsheet` feature).
    pub fn detect(bytes: &[u8], file_name: Option<&str>) -> Result<Self, QuoteError> {
        let head = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
        if head.windows(5).any(|w| w == b"%PDF-") {
            return Ok(DocumentFormat::Pdf);
        }
        if is_rtf(bytes) {
            return Ok(DocumentFormat::Rtf);
        }

        let extension = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        if bytes.starts_with(b"PK\x03\x04") {
            return match extension.as_deref() {
                Some("xlsx") | Some("xlsm") | None if cfg!(feature = "spreadsheet") => {
                    Ok(DocumentFormat::Xlsx)
                }
                Some("xlsx") | Some("xlsm") | None => Err(QuoteError::UnsupportedFormat(
                    "XLSX input needs the `spreadsheet` feature".to_string(),
                )),
                Some(other) => Err(QuoteError::UnsupportedFormat(format!(
                    "zip container with extension .{other}"
                ))),
            };
        }
        if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            return Err(QuoteError::UnsupportedFormat(
                "legacy binary Office document".to_string(),
            ));
        }

        match extension.as_deref() {
            Some("csv") => Ok(DocumentFormat::Csv),
            _ => Ok(DocumentFormat::PlainText),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Rtf => "rtf",
            DocumentFormat::Csv => "csv",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::PlainText => "text",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Source {
    Pdf(PdfSource),
    /// Single-page text recovered from a non-PDF source.
    Text(String),
}

/// A document opened for price detection.
///
/// PDFs keep their pages; every other format is one position-less page of
/// text.
#[derive(Debug)]
pub struct Document {
    format: DocumentFormat,
    source: Source,
    /// Problems found while decoding a text source, reported with page 0.
    decode_warnings: Vec<ExtractWarning>,
}

impl Document {
    /// Open a document from memory. `file_name` helps format detection for
    /// formats without a signature (CSV).
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError`] when the bytes cannot be read as the detected
    /// format. Text formats never fail on encoding problems.
    pub fn open(bytes: &[u8], file_name: Option<&str>) -> Result<Self, QuoteError> {
        let format = DocumentFormat::detect(bytes, file_name)?;
        let mut decode_warnings = Vec::new();
        let source = match format {
            DocumentFormat::Pdf => Source::Pdf(PdfSource::open(bytes)?),
            DocumentFormat::Rtf => Source::Text(strip_rtf(bytes)),
            DocumentFormat::Csv => Source::Text(csv_to_text(bytes)?),
            DocumentFormat::Xlsx => Source::Text(read_xlsx(bytes)?),
            DocumentFormat::PlainText => {
                let decoded = decode_best(bytes);
                decode_warnings.extend(decoded.fallback_warning());
                Source::Text(decoded.text)
            }
        };
        tracing::debug!(%format, warnings = decode_warnings.len(), "opened document");
        Ok(Self {
            format,
            source,
            decode_warnings,
        })
    }

    /// Open a document from a file path.
    #[cfg(feature = "std")]
    pub fn open_file(path: impl AsRef<std::path::Path>) -> Result<Self, QuoteError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path.file_name().and_then(|n| n.to_str());
        Self::open(&bytes, file_name)
    }

    /// Wrap already extracted text, e.g. pasted by the user.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            format: DocumentFormat::PlainText,
            source: Source::Text(text.into()),
            decode_warnings: Vec::new(),
        }
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn page_count(&self) -> usize {
        match &self.source {
            Source::Pdf(pdf) => pdf.page_count(),
            Source::Text(_) => 1,
        }
    }

    /// The underlying PDF, if this is one.
    pub fn pdf(&self) -> Option<&PdfSource> {
        match &self.source {
            Source::Pdf(pdf) => Some(pdf),
            Source::Text(_) => None,
        }
    }

    /// Fragments of one page. Non-PDF sources ignore `mode`: their only page
    /// is a single position-less fragment.
    pub fn page_fragments(&self, index: usize, mode: ExtractMode) -> ExtractResult<Vec<TextFragment>> {
        match &self.source {
            Source::Pdf(pdf) => pdf.page_fragments(index, mode),
            Source::Text(text) if index == 0 => ExtractResult::with_warnings(
                vec![TextFragment::new(text.clone(), 0)],
                self.decode_warnings.clone(),
            ),
            Source::Text(_) => ExtractResult::ok(Vec::new()),
        }
    }

    /// Fragments of every page, in page order.
    pub fn fragments(&self, mode: ExtractMode) -> ExtractResult<Vec<TextFragment>> {
        match &self.source {
            Source::Pdf(pdf) => pdf.extract(mode),
            Source::Text(_) => self.page_fragments(0, mode),
        }
    }
}

#[cfg(feature = "spreadsheet")]
fn read_xlsx(bytes: &[u8]) -> Result<String, QuoteError> {
    Ok(quotekit_parse::xlsx_to_text(bytes)?)
}

#[cfg(not(feature = "spreadsheet"))]
fn read_xlsx(_bytes: &[u8]) -> Result<String, QuoteError> {
    Err(QuoteError::UnsupportedFormat(
        "XLSX input needs the `spreadsheet` feature".to_string(),
    ))
}
