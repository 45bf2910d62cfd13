//! Rule-based price detection.
//!
//! [`PriceDetector`] runs every rule of a [`RuleSet`] over a page's text (bulk
//! mode) or over a page's positioned text runs, parses and range-checks each
//! amount, drops duplicates and returns the accepted prices sorted by
//! [`sort_prices`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::dedupe::{DedupeOptions, is_duplicate};
use crate::fragment::TextFragment;
use crate::geometry::Point;
use crate::money::{parse_amount, round2};
use crate::price::{DetectedPrice, sort_prices};
use crate::rules::{PriceRule, RuleSet, classify_context};

/// Options controlling price detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorOptions {
    /// Ordered recognition rules. Default: [`RuleSet::default`].
    pub rules: RuleSet,
    /// Exclusive upper bound for accepted values. Default: `1_000_000.0`.
    pub max_value: f64,
    /// Values closer than this are the same amount. Default: `0.01`.
    pub value_tolerance: f64,
    /// Per-axis distance within which positioned prices collide. Default: `10.0`.
    pub position_tolerance: f64,
    /// Fragments on either side inspected during context validation. Default: `3`.
    pub context_window: usize,
    /// Matches below this confidence need supporting context in positioned
    /// mode. Default: `0.70`.
    pub low_confidence_threshold: f64,
    /// First synthesized slot for position-less prices. Default: `(450, 650)`.
    pub synthetic_origin: Point,
    /// Step between synthesized slots: `x` per rule, `y` per accepted price.
    /// Default: `(25, 25)`.
    pub synthetic_step: Point,
    /// Character advance for positioned runs that do not carry their own.
    /// Default: `5.0` (an average glyph at 10pt).
    pub default_char_advance: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            max_value: 1_000_000.0,
            value_tolerance: 0.01,
            position_tolerance: 10.0,
            context_window: 3,
            low_confidence_threshold: 0.70,
            synthetic_origin: Point::new(450.0, 650.0),
            synthetic_step: Point::new(25.0, 25.0),
            default_char_advance: 5.0,
        }
    }
}

impl DetectorOptions {
    pub fn dedupe(&self) -> DedupeOptions {
        DedupeOptions {
            value_tolerance: self.value_tolerance,
            position_tolerance: self.position_tolerance,
        }
    }
}

/// A rule that could not be compiled and is left out of detection.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRule {
    pub name: String,
    pub error: String,
}

#[derive(Debug)]
struct CompiledRule {
    index: usize,
    rule: PriceRule,
    regex: Regex,
}

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[/.-]\d{1,2}[/.-](?:\d{4}|\d{2})\b").expect("valid regex")
});
static LONG_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{10,}").expect("valid regex"));
static ID_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,}(?:-\d{2,}){2,}\b").expect("valid regex"));
static PRICE_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[€$£]|\b(?:eur|euro|ευρ[ώω])\b|τιμ[ήη]|κ[όο]στος|σ[ύυ]νολο|ποσ[όο]|αξ[ίι]α|φ\.?π\.?α|μεταφορικ|\b(?:price|cost|total|subtotal|amount|vat|tax|shipping)\b",
    )
    .expect("valid regex")
});

/// Finds prices in extracted text.
///
/// Construction compiles the rule set once; a rule whose pattern does not
/// compile is logged, recorded in [`PriceDetector::skipped_rules`] and left
/// out, so the remaining rules keep working. Detection itself never fails.
#[derive(Debug)]
pub struct PriceDetector {
    options: DetectorOptions,
    compiled: Vec<CompiledRule>,
    skipped: Vec<SkippedRule>,
}

impl Default for PriceDetector {
    fn default() -> Self {
        Self::new(DetectorOptions::default())
    }
}

impl PriceDetector {
    pub fn new(options: DetectorOptions) -> Self {
        let mut compiled = Vec::with_capacity(options.rules.len());
        let mut skipped = Vec::new();

        for (index, rule) in options.rules.rules.iter().enumerate() {
            match Regex::new(&rule.pattern) {
                Ok(regex) => compiled.push(CompiledRule {
                    index,
                    rule: rule.clone(),
                    regex,
                }),
                Err(err) => {
                    tracing::warn!(rule = %rule.name, error = %err, "skipping price rule");
                    skipped.push(SkippedRule {
                        name: rule.name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        Self {
            options,
            compiled,
            skipped,
        }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Rules left out because their pattern did not compile.
    pub fn skipped_rules(&self) -> &[SkippedRule] {
        &self.skipped
    }

    /// Detect prices in one page's concatenated text.
    ///
    /// Every record gets a synthesized position and duplicates are decided
    /// on value and page alone.
    pub fn detect_text(&self, text: &str, page_index: usize) -> Vec<DetectedPrice> {
        self.detect_fragments(std::slice::from_ref(&TextFragment::new(text, page_index)))
    }

    /// Detect prices in a sequence of fragments, possibly spanning pages.
    ///
    /// Rules run in priority order over all fragments, so a higher-priority
    /// rule claims an amount before any lower one sees it. Positioned
    /// fragments keep their position; low-confidence matches in them must
    /// pass context validation against neighbouring fragments.
    pub fn detect_fragments(&self, fragments: &[TextFragment]) -> Vec<DetectedPrice> {
        let dedupe = self.options.dedupe();
        let mut accepted: Vec<DetectedPrice> = Vec::new();
        let mut per_page: HashMap<usize, usize> = HashMap::new();

        for compiled in &self.compiled {
            for (frag_idx, fragment) in fragments.iter().enumerate() {
                if fragment.is_blank() {
                    continue;
                }
                for caps in compiled.regex.captures_iter(&fragment.text) {
                    let Some(whole) = caps.get(0) else { continue };
                    let amount = caps
                        .name("amount")
                        .or_else(|| caps.get(1))
                        .unwrap_or(whole);
                    let text = fragment.text.as_str();

                    if !is_isolated(text, amount.start(), amount.end()) {
                        continue;
                    }
                    if compiled.rule.standalone && !is_standalone(text, whole.start(), whole.end())
                    {
                        continue;
                    }
                    let Some(value) = parse_amount(amount.as_str()).map(round2) else {
                        continue;
                    };
                    if !(value > 0.0 && value < self.options.max_value) {
                        tracing::trace!(rule = %compiled.rule.name, value, "value out of range");
                        continue;
                    }
                    if fragment.position.is_some()
                        && compiled.rule.confidence < self.options.low_confidence_threshold
                        && !self.has_supporting_context(fragments, frag_idx)
                    {
                        tracing::trace!(rule = %compiled.rule.name, value, "no supporting context");
                        continue;
                    }

                    let page = fragment.page_index;
                    let count = per_page.get(&page).copied().unwrap_or(0);
                    let category = compiled.rule.category.unwrap_or_else(|| {
                        let preceding = preceding_text(fragments, frag_idx, whole.start());
                        classify_context(&preceding)
                            .unwrap_or_else(|| compiled.rule.tier.fallback_category())
                    });

                    let start = price_start(text, whole.start(), amount.start());
                    let candidate = match fragment.position {
                        Some(origin) => DetectedPrice::new(
                            String::new(),
                            value,
                            self.offset_position(fragment, origin, start),
                            page,
                            compiled.rule.confidence,
                            category,
                        ),
                        None => DetectedPrice::new(
                            String::new(),
                            value,
                            self.synthesized_position(compiled.index, count),
                            page,
                            compiled.rule.confidence,
                            category,
                        )
                        .with_synthesized_position(),
                    };

                    if accepted.iter().any(|k| is_duplicate(k, &candidate, &dedupe)) {
                        tracing::trace!(rule = %compiled.rule.name, value, "duplicate price");
                        continue;
                    }

                    let mut price = candidate
                        .with_context(format!("{}: {}", compiled.rule.name, whole.as_str()))
                        .with_matched_text(&text[start..whole.end()]);
                    price.id = format!("p{page}-{count}");
                    per_page.insert(page, count + 1);
                    accepted.push(price);
                }
            }
        }

        sort_prices(&mut accepted);
        accepted
    }

    fn synthesized_position(&self, rule_index: usize, accepted_on_page: usize) -> Point {
        let origin = self.options.synthetic_origin;
        let step = self.options.synthetic_step;
        Point::new(
            origin.x + rule_index as f64 * step.x,
            origin.y - accepted_on_page as f64 * step.y,
        )
    }

    /// Where the character at byte `offset` of a positioned run starts.
    fn offset_position(&self, fragment: &TextFragment, origin: Point, offset: usize) -> Point {
        let advance = fragment
            .char_advance
            .unwrap_or(self.options.default_char_advance);
        let chars = fragment.text[..offset].chars().count();
        Point::new(origin.x + chars as f64 * advance, origin.y)
    }

    fn has_supporting_context(&self, fragments: &[TextFragment], index: usize) -> bool {
        let own = &fragments[index];
        if DATE.is_match(&own.text) || LONG_DIGITS.is_match(&own.text) || ID_LIKE.is_match(&own.text)
        {
            return false;
        }
        let lo = index.saturating_sub(self.options.context_window);
        let hi = (index + self.options.context_window).min(fragments.len() - 1);
        fragments[lo..=hi]
            .iter()
            .filter(|f| f.page_index == own.page_index)
            .any(|f| PRICE_CONTEXT.is_match(&f.text))
    }
}

/// The amount must not continue a longer number or follow a minus sign, and
/// must not be a percentage.
fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    if matches!(before, Some(c) if c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '−')) {
        return false;
    }
    let mut after = text[end..].chars();
    match after.next() {
        Some('%') => false,
        Some('.' | ',') => !after.next().is_some_and(|c| c.is_ascii_digit()),
        _ => true,
    }
}

/// Start of the printed price inside a match: the amount, widened to a
/// currency sign or code directly in front of it. Keyword labels stay out.
fn price_start(text: &str, match_start: usize, amount_start: usize) -> usize {
    let prefix = text[match_start..amount_start].trim_end();
    let end = match_start + prefix.len();
    if let Some(sign) = prefix.chars().next_back().filter(|c| matches!(c, '€' | '$' | '£')) {
        return end - sign.len_utf8();
    }
    let code_start = end.saturating_sub(3);
    if code_start >= match_start
        && text.is_char_boundary(code_start)
        && text[code_start..end].eq_ignore_ascii_case("eur")
    {
        return code_start;
    }
    amount_start
}

fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start].chars().next_back().is_none_or(char::is_whitespace);
    let after_ok = text[end..].chars().next().is_none_or(char::is_whitespace);
    before_ok && after_ok
}

/// Text before a match: the previous fragment on the same page (runs are
/// often split between label and amount) plus the fragment's own prefix.
fn preceding_text(fragments: &[TextFragment], index: usize, offset: usize) -> String {
    let own = &fragments[index];
    let mut text = String::new();
    if let Some(prev) = index.checked_sub(1).map(|i| &fragments[i]) {
        if prev.page_index == own.page_index {
            text.push_str(&prev.text);
            text.push(' ');
        }
    }
    text.push_str(&own.text[..offset]);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::format_price;
    use crate::price::PriceCategory;
    use crate::rules::RuleTier;

    fn detect(text: &str) -> Vec<DetectedPrice> {
        PriceDetector::default().detect_text(text, 0)
    }

    #[test]
    fn greek_quotation_line() {
        let prices = detect("Τιμή μονάδας: 45,00 ΦΠΑ: 10,80 Σύνολο: 55,80");
        assert_eq!(prices.len(), 3);

        let find = |v: f64| prices.iter().find(|p| (p.value() - v).abs() < 1e-9).unwrap();
        assert_eq!(find(45.0).category, PriceCategory::Product);
        assert_eq!(find(10.8).category, PriceCategory::Tax);
        assert_eq!(find(55.8).category, PriceCategory::Total);
        assert!(prices.iter().all(|p| p.confidence >= 0.85));
    }

    #[test]
    fn same_amount_two_formats_is_one_price() {
        let prices = detect("€99.90 and 99,90€");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].value(), 99.9);
        assert_eq!(prices[0].confidence, 0.95);
    }

    #[test]
    fn same_amount_two_formats_positioned() {
        let frags = vec![
            TextFragment::positioned("€99.90", 100.0, 700.0, 0),
            TextFragment::positioned("99,90€", 105.0, 700.0, 0),
        ];
        let prices = PriceDetector::default().detect_fragments(&frags);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].value(), 99.9);
        assert_eq!(prices[0].confidence, 0.95);
        assert_eq!(prices[0].position, Point::new(100.0, 700.0));
        assert!(!prices[0].position_synthesized);
    }

    #[test]
    fn same_amount_far_apart_is_two_prices() {
        let frags = vec![
            TextFragment::positioned("€99.90", 100.0, 700.0, 0),
            TextFragment::positioned("€99.90", 100.0, 500.0, 0),
        ];
        assert_eq!(PriceDetector::default().detect_fragments(&frags).len(), 2);
    }

    #[test]
    fn out_of_range_values_are_dropped() {
        assert!(detect("€0 €-5 €2000000").is_empty());
    }

    #[test]
    fn custom_max_value() {
        let detector = PriceDetector::new(DetectorOptions {
            max_value: 100.0,
            ..DetectorOptions::default()
        });
        assert!(detector.detect_text("€150.00", 0).is_empty());
        assert_eq!(detector.detect_text("€99.00", 0).len(), 1);
    }

    #[test]
    fn formatted_price_detects_back() {
        for v in [0.01, 4.5, 99.9, 1234.56, 999_999.99] {
            let text = format_price("€", v);
            let prices = detect(&text);
            assert_eq!(prices.len(), 1, "{text}");
            assert!((prices[0].value() - v).abs() < 0.01, "{text}");
            assert_eq!(prices[0].confidence, 0.95);
        }
    }

    #[test]
    fn percentage_rates_are_not_prices() {
        let prices = detect("ΦΠΑ 24%: 10,80");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].value(), 10.8);
        assert_eq!(prices[0].category, PriceCategory::Tax);
    }

    #[test]
    fn bare_numbers_need_whitespace() {
        let prices = detect("Item A 12,50 item B x15,00");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].value(), 12.5);
        assert_eq!(prices[0].category, PriceCategory::Other);
        assert_eq!(prices[0].confidence, 0.45);
    }

    #[test]
    fn adjacent_bare_numbers_are_both_found() {
        let prices = detect("12,50 13,75");
        assert_eq!(prices.len(), 2);
    }

    #[test]
    fn currency_match_classified_from_context() {
        let prices = detect("Shipping €7.50");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].category, PriceCategory::Shipping);

        let prices = detect("Widget €7.50");
        assert_eq!(prices[0].category, PriceCategory::Product);
    }

    #[test]
    fn ids_count_per_page() {
        let detector = PriceDetector::default();
        let frags = vec![
            TextFragment::new("€1.00 €2.00", 0),
            TextFragment::new("€3.00", 1),
        ];
        let mut ids: Vec<String> = detector
            .detect_fragments(&frags)
            .into_iter()
            .map(|p| p.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["p0-0", "p0-1", "p1-0"]);
    }

    #[test]
    fn synthesized_positions_follow_rule_and_count() {
        let prices = detect("€1.00 €2.00");
        let first = prices.iter().find(|p| p.value() == 1.0).unwrap();
        let second = prices.iter().find(|p| p.value() == 2.0).unwrap();
        assert!(first.position_synthesized);
        assert_eq!(first.position, Point::new(450.0, 650.0));
        assert_eq!(second.position, Point::new(450.0, 625.0));
    }

    #[test]
    fn context_records_rule_and_match() {
        let prices = detect("Σύνολο: 55,80");
        assert_eq!(prices[0].context, "el-total: Σύνολο: 55,80");
        assert_eq!(prices[0].matched_text, "55,80");
    }

    #[test]
    fn price_mid_run_is_placed_at_the_amount() {
        let frags = vec![TextFragment::positioned("Chair 45,00 €", 72.0, 700.0, 0)];
        let prices = PriceDetector::default().detect_fragments(&frags);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].matched_text, "45,00 €");
        // six characters in at the default advance of 5pt
        assert_eq!(prices[0].position, Point::new(102.0, 700.0));
    }

    #[test]
    fn keyword_label_is_not_part_of_the_price() {
        let frags = vec![
            TextFragment::positioned("Τιμή: 45,00", 72.0, 700.0, 0).with_char_advance(4.0),
            TextFragment::positioned("Total € 12,00", 72.0, 650.0, 0).with_char_advance(4.0),
        ];
        let prices = PriceDetector::default().detect_fragments(&frags);
        let unit = prices.iter().find(|p| p.value() == 45.0).unwrap();
        assert_eq!(unit.matched_text, "45,00");
        assert_eq!(unit.position, Point::new(96.0, 700.0));
        let total = prices.iter().find(|p| p.value() == 12.0).unwrap();
        assert_eq!(total.matched_text, "€ 12,00");
        assert_eq!(total.position, Point::new(96.0, 650.0));
    }

    #[test]
    fn output_is_sorted_by_band_then_value() {
        let prices = detect("€50.00 Τιμή: 10,00 lonely 5,00");
        let values: Vec<f64> = prices.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![50.0, 10.0, 5.0]);
    }

    #[test]
    fn low_confidence_needs_neighbouring_keyword() {
        let detector = PriceDetector::default();
        let lonely = vec![
            TextFragment::positioned("Qty", 50.0, 700.0, 0),
            TextFragment::positioned("45.00", 100.0, 700.0, 0),
        ];
        assert!(detector.detect_fragments(&lonely).is_empty());

        let priced = vec![
            TextFragment::positioned("Price", 50.0, 700.0, 0),
            TextFragment::positioned("45.00", 100.0, 700.0, 0),
        ];
        let prices = detector.detect_fragments(&priced);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].position, Point::new(100.0, 700.0));
    }

    #[test]
    fn dates_and_phone_numbers_are_rejected() {
        let detector = PriceDetector::default();
        let frags = vec![
            TextFragment::positioned("Price list", 50.0, 720.0, 0),
            TextFragment::positioned("12/03/2024 45.00", 50.0, 700.0, 0),
            TextFragment::positioned("Tel 2101234567 12.50", 50.0, 680.0, 0),
            TextFragment::positioned("Ref 123-456-789 33.00", 50.0, 660.0, 0),
        ];
        assert!(detector.detect_fragments(&frags).is_empty());
    }

    #[test]
    fn context_window_does_not_cross_pages() {
        let frags = vec![
            TextFragment::positioned("Price", 50.0, 700.0, 0),
            TextFragment::positioned("45.00", 100.0, 700.0, 1),
        ];
        assert!(PriceDetector::default().detect_fragments(&frags).is_empty());
    }

    #[test]
    fn bulk_text_skips_context_validation() {
        assert_eq!(detect("Qty 3 45.00").len(), 1);
    }

    #[test]
    fn invalid_rule_is_skipped() {
        let rules = RuleSet::new(vec![
            PriceRule::new("broken", r"(€\d+", 0.9, RuleTier::CurrencySymbol),
            PriceRule::new("euro", r"€(?P<amount>\d+)", 0.8, RuleTier::CurrencyCode),
        ]);
        let detector = PriceDetector::new(DetectorOptions {
            rules,
            ..DetectorOptions::default()
        });
        assert_eq!(detector.skipped_rules().len(), 1);
        assert_eq!(detector.skipped_rules()[0].name, "broken");
        assert_eq!(detector.detect_text("€42", 0).len(), 1);
    }

    #[test]
    fn rule_without_named_group_uses_first_group() {
        let rules = RuleSet::new(vec![PriceRule::new(
            "eur",
            r"EUR (\d+)",
            0.7,
            RuleTier::CurrencyCode,
        )]);
        let detector = PriceDetector::new(DetectorOptions {
            rules,
            ..DetectorOptions::default()
        });
        assert_eq!(detector.detect_text("EUR 12", 0)[0].value(), 12.0);
    }

    #[test]
    fn empty_and_odd_input_never_panics() {
        let detector = PriceDetector::default();
        let long = "9".repeat(400);
        for text in ["", "   ", "€", "€€€", "1,,,,2", "ΦΠΑ", "\u{FFFD}\u{FFFD}", long.as_str()] {
            let _ = detector.detect_text(text, 0);
        }
    }

    #[test]
    fn empty_fragment_slice() {
        assert!(PriceDetector::default().detect_fragments(&[]).is_empty());
    }
}
