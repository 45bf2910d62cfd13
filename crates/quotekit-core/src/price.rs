//! Detected price records and their ordering.

use std::cmp::Ordering;
use std::fmt;

use crate::geometry::Point;
use crate::money::round2;

/// Tolerance below which a value counts as unchanged from its original.
pub const MODIFIED_TOLERANCE: f64 = 0.005;

/// Width of a confidence band for ordering purposes.
pub const CONFIDENCE_BAND: f64 = 0.05;

/// Semantic classification of a detected price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PriceCategory {
    /// A product line item or unit price.
    Product,
    /// A grand total or subtotal.
    Total,
    /// VAT or other tax.
    Tax,
    /// Shipping or delivery cost.
    Shipping,
    /// Anything else (discounts, generic amounts).
    Other,
}

impl PriceCategory {
    /// All categories in display order.
    pub const ALL: [PriceCategory; 5] = [
        PriceCategory::Product,
        PriceCategory::Total,
        PriceCategory::Tax,
        PriceCategory::Shipping,
        PriceCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceCategory::Product => "product",
            PriceCategory::Total => "total",
            PriceCategory::Tax => "tax",
            PriceCategory::Shipping => "shipping",
            PriceCategory::Other => "other",
        }
    }
}

impl fmt::Display for PriceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognized monetary amount.
///
/// `original_value` is fixed at construction. The current `value` and the
/// `is_modified` flag only change through [`DetectedPrice::with_value`] and
/// [`DetectedPrice::reset`], which keep the two consistent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DetectedPrice {
    /// Unique within a detection session; stable across adjustments.
    pub id: String,
    value: f64,
    original_value: f64,
    /// Source position, or a synthesized layout slot.
    pub position: Point,
    /// Whether `position` was synthesized rather than extracted.
    pub position_synthesized: bool,
    /// Zero-based page number.
    pub page_index: usize,
    /// Heuristic certainty in `[0, 1]` that this is a real price.
    pub confidence: f64,
    pub category: PriceCategory,
    is_modified: bool,
    /// Which rule matched, for display.
    pub context: String,
    /// The exact source text of the match.
    pub matched_text: String,
}

impl DetectedPrice {
    /// Create a freshly detected, unmodified price.
    pub fn new(
        id: impl Into<String>,
        value: f64,
        position: Point,
        page_index: usize,
        confidence: f64,
        category: PriceCategory,
    ) -> Self {
        let value = round2(value);
        Self {
            id: id.into(),
            value,
            original_value: value,
            position,
            position_synthesized: false,
            page_index,
            confidence: confidence.clamp(0.0, 1.0),
            category,
            is_modified: false,
            context: String::new(),
            matched_text: String::new(),
        }
    }

    /// Builder-style setter for the display context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Builder-style setter for the matched source text.
    pub fn with_matched_text(mut self, text: impl Into<String>) -> Self {
        self.matched_text = text.into();
        self
    }

    /// Mark the position as synthesized.
    pub fn with_synthesized_position(mut self) -> Self {
        self.position_synthesized = true;
        self
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Value at detection time.
    pub fn original_value(&self) -> f64 {
        self.original_value
    }

    /// Whether the current value differs from the original.
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// A copy carrying `value` (rounded to cents), with `is_modified` recomputed.
    pub fn with_value(&self, value: f64) -> Self {
        let value = round2(value);
        Self {
            value,
            is_modified: (value - self.original_value).abs() > MODIFIED_TOLERANCE,
            ..self.clone()
        }
    }

    /// A copy restored to the original value.
    pub fn reset(&self) -> Self {
        Self {
            value: self.original_value,
            is_modified: false,
            ..self.clone()
        }
    }

    /// The confidence band used for ordering (0.05 wide).
    pub fn confidence_band(&self) -> i64 {
        (self.confidence / CONFIDENCE_BAND).round() as i64
    }
}

/// Ordering used for detector output: confidence band descending, then value
/// ascending. This is a total preorder, so it is safe for sorting.
pub fn price_order(a: &DetectedPrice, b: &DetectedPrice) -> Ordering {
    b.confidence_band()
        .cmp(&a.confidence_band())
        .then_with(|| a.value.total_cmp(&b.value))
}

/// Stable-sort prices by [`price_order`]; equal records keep detection order.
pub fn sort_prices(prices: &mut [DetectedPrice]) {
    prices.sort_by(price_order);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(id: &str, value: f64, confidence: f64) -> DetectedPrice {
        DetectedPrice::new(
            id,
            value,
            Point::new(0.0, 0.0),
            0,
            confidence,
            PriceCategory::Product,
        )
    }

    #[test]
    fn new_price_is_unmodified() {
        let p = price("a", 12.346, 0.9);
        assert_eq!(p.value(), 12.35);
        assert_eq!(p.original_value(), 12.35);
        assert!(!p.is_modified());
    }

    #[test]
    fn with_value_marks_modified() {
        let p = price("a", 100.0, 0.9).with_value(120.0);
        assert_eq!(p.value(), 120.0);
        assert_eq!(p.original_value(), 100.0);
        assert!(p.is_modified());
    }

    #[test]
    fn with_value_within_tolerance_is_not_modified() {
        let p = price("a", 100.0, 0.9).with_value(100.004);
        assert!(!p.is_modified());
    }

    #[test]
    fn reset_restores_original() {
        let p = price("a", 50.0, 0.9).with_value(75.0).reset();
        assert_eq!(p.value(), 50.0);
        assert!(!p.is_modified());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(price("a", 1.0, 1.7).confidence, 1.0);
        assert_eq!(price("a", 1.0, -0.2).confidence, 0.0);
    }

    #[test]
    fn confidence_dominates_value() {
        let mut prices = vec![price("c", 5.0, 0.40), price("b", 10.0, 0.90), price("a", 50.0, 0.95)];
        sort_prices(&mut prices);
        let values: Vec<f64> = prices.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![50.0, 10.0, 5.0]);
    }

    #[test]
    fn same_band_sorts_by_value() {
        let mut prices = vec![price("a", 30.0, 0.95), price("b", 10.0, 0.96), price("c", 20.0, 0.94)];
        sort_prices(&mut prices);
        let ids: Vec<&str> = prices.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_records_keep_detection_order() {
        let mut prices = vec![price("first", 10.0, 0.9), price("second", 10.0, 0.9)];
        sort_prices(&mut prices);
        assert_eq!(prices[0].id, "first");
        assert_eq!(prices[1].id, "second");
    }

    #[test]
    fn category_display() {
        assert_eq!(PriceCategory::Shipping.to_string(), "shipping");
        assert_eq!(PriceCategory::ALL.len(), 5);
    }
}
