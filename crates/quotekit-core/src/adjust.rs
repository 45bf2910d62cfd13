//! Percentage adjustment of detected prices.
//!
//! All operations are pure: they take a price list and return a new one.
//! New values are always computed from each record's original value, so
//! applying +10% and then +20% gives the same result as applying +20%.

use crate::error::AdjustError;
use crate::money::{Percentage, round2};
use crate::price::DetectedPrice;
use crate::summary::{PriceSummary, summarize};

/// Scale every price's original value by `percentage`.
///
/// Results are rounded to cents; a price only counts as modified when the
/// result differs from its original by more than
/// [`MODIFIED_TOLERANCE`](crate::price::MODIFIED_TOLERANCE) (0.005).
pub fn apply_percentage_to_all(
    prices: &[DetectedPrice],
    percentage: Percentage,
) -> Vec<DetectedPrice> {
    let factor = percentage.factor();
    prices
        .iter()
        .map(|p| p.with_value(round2(p.original_value() * factor)))
        .collect()
}

/// Set the value of the price with `id`, leaving every other record as is.
///
/// Fails without touching anything when `id` is unknown or `new_value` is
/// negative or not finite.
pub fn update_single(
    prices: &[DetectedPrice],
    id: &str,
    new_value: f64,
) -> Result<Vec<DetectedPrice>, AdjustError> {
    if !new_value.is_finite() || new_value < 0.0 {
        return Err(AdjustError::InvalidValue(new_value));
    }
    if !prices.iter().any(|p| p.id == id) {
        return Err(AdjustError::UnknownId(id.to_string()));
    }
    Ok(prices
        .iter()
        .map(|p| {
            if p.id == id {
                p.with_value(new_value)
            } else {
                p.clone()
            }
        })
        .collect())
}

/// Restore every price to its original value.
pub fn reset(prices: &[DetectedPrice]) -> Vec<DetectedPrice> {
    prices.iter().map(DetectedPrice::reset).collect()
}

/// An immutable snapshot of one document's prices.
///
/// Each operation returns a new snapshot; the caller keeps whichever one is
/// current. The percentage last applied to all prices is remembered so a UI
/// can show it next to the list.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PriceSet {
    prices: Vec<DetectedPrice>,
    percentage: Option<Percentage>,
}

impl PriceSet {
    pub fn new(prices: Vec<DetectedPrice>) -> Self {
        Self {
            prices,
            percentage: None,
        }
    }

    pub fn prices(&self) -> &[DetectedPrice] {
        &self.prices
    }

    pub fn into_prices(self) -> Vec<DetectedPrice> {
        self.prices
    }

    /// The last percentage applied to all prices, if any.
    pub fn percentage(&self) -> Option<Percentage> {
        self.percentage
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DetectedPrice> {
        self.prices.iter().find(|p| p.id == id)
    }

    pub fn apply_percentage(&self, percentage: Percentage) -> Self {
        Self {
            prices: apply_percentage_to_all(&self.prices, percentage),
            percentage: Some(percentage),
        }
    }

    pub fn update_single(&self, id: &str, new_value: f64) -> Result<Self, AdjustError> {
        Ok(Self {
            prices: update_single(&self.prices, id, new_value)?,
            percentage: self.percentage,
        })
    }

    pub fn reset(&self) -> Self {
        Self::new(reset(&self.prices))
    }

    pub fn modified(&self) -> impl Iterator<Item = &DetectedPrice> {
        self.prices.iter().filter(|p| p.is_modified())
    }

    pub fn summary(&self) -> PriceSummary {
        summarize(&self.prices)
    }
}

impl From<Vec<DetectedPrice>> for PriceSet {
    fn from(prices: Vec<DetectedPrice>) -> Self {
        Self::new(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::price::PriceCategory;
    use proptest::prelude::*;

    fn make_price(id: &str, value: f64) -> DetectedPrice {
        DetectedPrice::new(id, value, Point::new(450.0, 650.0), 0, 0.95, PriceCategory::Product)
    }

    fn pct(value: f64) -> Percentage {
        Percentage::new(value).unwrap()
    }

    fn sample() -> Vec<DetectedPrice> {
        vec![make_price("a", 100.0), make_price("b", 50.0)]
    }

    fn values(prices: &[DetectedPrice]) -> Vec<f64> {
        prices.iter().map(|p| p.value()).collect()
    }

    #[test]
    fn twenty_percent_then_zero() {
        let raised = apply_percentage_to_all(&sample(), pct(20.0));
        assert_eq!(values(&raised), vec![120.0, 60.0]);
        assert!(raised.iter().all(|p| p.is_modified()));

        let back = apply_percentage_to_all(&raised, Percentage::ZERO);
        assert_eq!(values(&back), vec![100.0, 50.0]);
        assert!(back.iter().all(|p| !p.is_modified()));
    }

    #[test]
    fn change_lost_to_cent_rounding_is_not_a_modification() {
        let tiny = apply_percentage_to_all(&[make_price("a", 0.01)], pct(10.0));
        assert_eq!(tiny[0].value(), 0.01);
        assert!(!tiny[0].is_modified());
    }

    #[test]
    fn percentages_do_not_compound() {
        let once = apply_percentage_to_all(&apply_percentage_to_all(&sample(), pct(10.0)), pct(20.0));
        let direct = apply_percentage_to_all(&sample(), pct(20.0));
        assert_eq!(once, direct);
    }

    #[test]
    fn minus_hundred_zeroes_everything() {
        let zeroed = apply_percentage_to_all(&sample(), pct(-100.0));
        assert_eq!(values(&zeroed), vec![0.0, 0.0]);
    }

    #[test]
    fn results_are_rounded_to_cents() {
        let prices = vec![make_price("a", 9.99)];
        let adjusted = apply_percentage_to_all(&prices, pct(7.0));
        assert_eq!(adjusted[0].value(), 10.69);
    }

    #[test]
    fn adjustment_keeps_identity_fields() {
        let adjusted = apply_percentage_to_all(&sample(), pct(15.0));
        for (before, after) in sample().iter().zip(&adjusted) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.original_value(), after.original_value());
            assert_eq!(before.page_index, after.page_index);
            assert_eq!(before.position, after.position);
        }
    }

    #[test]
    fn update_single_changes_one_record() {
        let updated = update_single(&sample(), "b", 75.0).unwrap();
        assert_eq!(updated[1].value(), 75.0);
        assert!(updated[1].is_modified());
        assert_eq!(updated[0], sample()[0]);
    }

    #[test]
    fn update_single_back_to_original_is_unmodified() {
        let updated = update_single(&sample(), "a", 100.0).unwrap();
        assert!(!updated[0].is_modified());
    }

    #[test]
    fn update_single_unknown_id() {
        assert_eq!(
            update_single(&sample(), "zzz", 1.0),
            Err(AdjustError::UnknownId("zzz".to_string()))
        );
    }

    #[test]
    fn update_single_rejects_bad_values() {
        assert!(matches!(
            update_single(&sample(), "a", f64::NAN),
            Err(AdjustError::InvalidValue(_))
        ));
        assert!(matches!(
            update_single(&sample(), "a", -1.0),
            Err(AdjustError::InvalidValue(_))
        ));
    }

    #[test]
    fn reset_after_edits() {
        let edited = update_single(&apply_percentage_to_all(&sample(), pct(33.0)), "a", 1.0).unwrap();
        let restored = reset(&edited);
        assert_eq!(restored, sample());
    }

    #[test]
    fn price_set_snapshots() {
        let set = PriceSet::new(sample());
        let raised = set.apply_percentage(pct(20.0));
        assert_eq!(raised.percentage(), Some(pct(20.0)));
        assert_eq!(set.get("a").unwrap().value(), 100.0);
        assert_eq!(raised.get("a").unwrap().value(), 120.0);
        assert_eq!(raised.modified().count(), 2);

        let edited = raised.update_single("b", 75.0).unwrap();
        assert_eq!(edited.get("b").unwrap().value(), 75.0);
        assert_eq!(edited.percentage(), Some(pct(20.0)));

        let restored = edited.reset();
        assert_eq!(restored.prices(), sample().as_slice());
        assert_eq!(restored.percentage(), None);
    }

    #[test]
    fn price_set_failed_update_keeps_snapshot() {
        let set = PriceSet::from(sample());
        assert!(set.update_single("missing", 5.0).is_err());
        assert_eq!(set.prices(), sample().as_slice());
    }

    fn arb_prices() -> impl Strategy<Value = Vec<DetectedPrice>> {
        prop::collection::vec(1u32..99_999_999, 0..20).prop_map(|cents| {
            cents
                .into_iter()
                .enumerate()
                .map(|(i, c)| make_price(&format!("p0-{i}"), f64::from(c) / 100.0))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn reapplying_depends_only_on_last(
            prices in arb_prices(),
            p1 in -100.0f64..500.0,
            p2 in -100.0f64..500.0,
        ) {
            let twice = apply_percentage_to_all(&apply_percentage_to_all(&prices, pct(p1)), pct(p2));
            let once = apply_percentage_to_all(&prices, pct(p2));
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn reset_restores_every_record(
            prices in arb_prices(),
            steps in prop::collection::vec(-100.0f64..500.0, 0..5),
        ) {
            let mut current = prices.clone();
            for p in steps {
                current = apply_percentage_to_all(&current, pct(p));
            }
            for p in reset(&current) {
                prop_assert_eq!(p.value(), p.original_value());
                prop_assert!(!p.is_modified());
            }
        }
    }
}
