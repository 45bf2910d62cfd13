//! Duplicate price suppression.
//!
//! The same amount is often found by several rules (`€99.90` matches both
//! the symbol rule and the loose currency rule) or printed twice on top of
//! itself. The first accepted record wins.

use crate::price::DetectedPrice;

/// Options for duplicate price detection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DedupeOptions {
    /// Maximum value difference for two prices to be the same amount.
    /// Default: `0.01`.
    pub value_tolerance: f64,
    /// Maximum per-axis distance between two real positions. Default: `10.0`.
    pub position_tolerance: f64,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            value_tolerance: 0.01,
            position_tolerance: 10.0,
        }
    }
}

/// Returns whether `b` duplicates the already accepted `a`.
///
/// Two prices are duplicates if:
/// 1. They are on the same page
/// 2. Their values differ by at most `value_tolerance`
/// 3. When both positions were extracted from the source, they are within
///    `position_tolerance` on each axis
pub fn is_duplicate(a: &DetectedPrice, b: &DetectedPrice, options: &DedupeOptions) -> bool {
    if a.page_index != b.page_index {
        return false;
    }
    // Small epsilon so that 0.01 apart still counts after cent rounding.
    if (a.value() - b.value()).abs() > options.value_tolerance + 1e-9 {
        return false;
    }
    if a.position_synthesized || b.position_synthesized {
        return true;
    }
    a.position.is_near(&b.position, options.position_tolerance)
}
