//! Aggregate figures for display next to a price list.

use std::collections::BTreeMap;

use crate::money::round2;
use crate::price::{DetectedPrice, PriceCategory};

/// Totals before and after adjustment, plus counts per category.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PriceSummary {
    pub count: usize,
    pub modified_count: usize,
    /// Sum of original values.
    pub total_before: f64,
    /// Sum of current values.
    pub total_after: f64,
    /// Relative change of the total in percent; `0` when `total_before` is `0`.
    pub percentage_change: f64,
    pub by_category: BTreeMap<PriceCategory, usize>,
}

/// Summarize a price list.
pub fn summarize(prices: &[DetectedPrice]) -> PriceSummary {
    let total_before = round2(prices.iter().map(DetectedPrice::original_value).sum());
    let total_after = round2(prices.iter().map(DetectedPrice::value).sum());
    let percentage_change = if total_before == 0.0 {
        0.0
    } else {
        round2((total_after - total_before) / total_before * 100.0)
    };

    let mut by_category = BTreeMap::new();
    for p in prices {
        *by_category.entry(p.category).or_insert(0) += 1;
    }

    PriceSummary {
        count: prices.len(),
        modified_count: prices.iter().filter(|p| p.is_modified()).count(),
        total_before,
        total_after,
        percentage_change,
        by_category,
    }
}
