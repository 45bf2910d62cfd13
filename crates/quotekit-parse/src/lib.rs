//! quotekit-parse: text source adapters.
//!
//! Turns document bytes into [`TextFragment`](quotekit_core::TextFragment)s
//! for the price detector: PDF pages through a content stream interpreter on
//! top of lopdf, RTF through a markup stripper, and plain text, CSV and
//! (with the `spreadsheet` feature) XLSX through encoding detection.

pub mod cmap;
pub mod encoding;
pub mod error;
pub mod pdf;
pub mod rtf;
pub mod tabular;
pub mod text_state;
pub mod tokenizer;

pub use encoding::{DecodedText, TextEncoding, decode_best, encoding_for_codepage};
pub use error::BackendError;
pub use pdf::{ExtractMode, PdfSource};
pub use quotekit_core;
pub use rtf::{is_rtf, strip_rtf};
#[cfg(feature = "spreadsheet")]
pub use tabular::xlsx_to_text;
pub use tabular::{csv_to_text, sniff_delimiter};
