//! Overlay plan for writing adjusted prices back into a PDF.
//!
//! For every modified price with an extracted position, the plan says which
//! rectangle to paint over the old text and what to draw in its place. The
//! PDF writer consumes the plan; nothing here touches document bytes.

use crate::geometry::{Point, Rect};
use crate::money::format_price;
use crate::price::DetectedPrice;

/// Approximate glyph advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f64 = 0.6;
/// Descender depth as a fraction of the font size.
const DESCENT: f64 = 0.25;

/// Options controlling overlay generation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OverlayOptions {
    /// Prefix for the drawn value. Default: `"€"`.
    pub currency_symbol: String,
    /// Font size of the replacement text. Default: `10.0`.
    pub font_size: f64,
    /// Extra margin around the cover rectangle. Default: `2.0`.
    pub padding: f64,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            currency_symbol: "€".to_string(),
            font_size: 10.0,
            padding: 2.0,
        }
    }
}

/// Paint `cover` with the background colour, then draw `text` at `position`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OverlayInstruction {
    pub price_id: String,
    pub page_index: usize,
    /// Text baseline origin.
    pub position: Point,
    pub cover: Rect,
    pub text: String,
    pub font_size: f64,
}

/// Build overlay instructions for all modified, really positioned prices.
///
/// Prices with synthesized positions are skipped: their coordinates do not
/// point at the source text. The cover starts at the price position and is
/// as wide as the longer of the printed price and its replacement; labels
/// sharing the run are left alone.
pub fn plan_overlays(prices: &[DetectedPrice], options: &OverlayOptions) -> Vec<OverlayInstruction> {
    prices
        .iter()
        .filter(|p| p.is_modified() && !p.position_synthesized)
        .map(|p| {
            let text = format_price(&options.currency_symbol, p.value());
            let chars = p.matched_text.chars().count().max(text.chars().count());
            let width = chars as f64 * options.font_size * AVG_GLYPH_WIDTH;
            let cover = Rect::new(
                p.position.x,
                p.position.y - options.font_size * DESCENT,
                width,
                options.font_size * (1.0 + DESCENT),
            )
            .inflate(options.padding);

            OverlayInstruction {
                price_id: p.id.clone(),
                page_index: p.page_index,
                position: p.position,
                cover,
                text,
                font_size: options.font_size,
            }
        })
        .collect()
}
