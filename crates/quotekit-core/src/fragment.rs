//! Text fragments produced by the text source adapters.

use crate::geometry::Point;

/// One unit of extracted text.
///
/// A fragment may hold a whole page (bulk extraction, RTF, CSV) or a single
/// text run (position-aware PDF extraction). Only PDF runs carry a position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TextFragment {
    /// Raw fragment content; may contain several candidate prices.
    pub text: String,
    /// Origin of the run in PDF page space, when known.
    pub position: Option<Point>,
    /// Zero-based page number.
    pub page_index: usize,
    /// Average page-space advance of one character in this run, when known.
    #[cfg_attr(feature = "serde", serde(default))]
    pub char_advance: Option<f64>,
}

impl TextFragment {
    /// A fragment without position information.
    pub fn new(text: impl Into<String>, page_index: usize) -> Self {
        Self {
            text: text.into(),
            position: None,
            page_index,
            char_advance: None,
        }
    }

    /// A fragment anchored at `(x, y)`.
    pub fn positioned(text: impl Into<String>, x: f64, y: f64, page_index: usize) -> Self {
        Self {
            text: text.into(),
            position: Some(Point::new(x, y)),
            page_index,
            char_advance: None,
        }
    }

    /// Builder-style setter for the per-character advance.
    pub fn with_char_advance(mut self, advance: f64) -> Self {
        self.char_advance = Some(advance);
        self
    }

    /// Whether the fragment holds no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Join fragments of one page into bulk text, separated by single spaces.
///
/// Blank fragments are skipped so they do not produce double spaces.
pub fn join_fragments(fragments: &[TextFragment]) -> String {
    let mut out = String::new();
    for frag in fragments.iter().filter(|f| !f.is_blank()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(frag.text.trim());
    }
    out
}
