//! Ranked price recognition rules.
//!
//! A [`RuleSet`] is an ordered list of [`PriceRule`]s. Order is priority:
//! when two rules find the same amount, the earlier rule's record is kept.
//! The default set targets Greek quotations with English fallbacks; callers
//! can supply their own set (for example loaded from JSON) instead.

use std::sync::LazyLock;

use regex::Regex;

use crate::price::PriceCategory;

/// An amount with exactly two decimals, grouping complementary to the
/// decimal separator (`1.234,56`, `1,234.56`, `99.90`).
pub const AMOUNT_TWO_DECIMALS: &str =
    r"\d{1,3}(?:\.\d{3})+,\d{2}|\d{1,3}(?:,\d{3})+\.\d{2}|\d+[.,]\d{2}";

/// An amount with optional grouping and zero to two decimals.
pub const AMOUNT_ANY: &str = r"\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?";

/// An amount with thousands grouping and two decimals, nothing else.
pub const AMOUNT_GROUPED: &str = r"\d{1,3}(?:\.\d{3})+,\d{2}|\d{1,3}(?:,\d{3})+\.\d{2}";

/// Recognition tier, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RuleTier {
    /// Currency symbol with exactly two decimals.
    CurrencySymbol,
    /// A domain keyword ("price", "total", "VAT", ...) before the amount.
    Keyword,
    /// Currency code or symbol with optional decimals.
    CurrencyCode,
    /// A standalone two-decimal number with no currency marker.
    Bare,
}

impl RuleTier {
    /// Category used when neither the rule nor the surrounding text decides.
    pub fn fallback_category(&self) -> PriceCategory {
        match self {
            RuleTier::Bare => PriceCategory::Other,
            _ => PriceCategory::Product,
        }
    }
}

/// One recognition rule.
///
/// `pattern` must contain a capture group named `amount`; when it does not,
/// the first capture group (or the whole match) is used as the amount.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceRule {
    /// Short identifier shown in the price's context.
    pub name: String,
    /// Regular expression (Rust `regex` syntax).
    pub pattern: String,
    /// Confidence assigned to matches, in `[0, 1]`.
    pub confidence: f64,
    /// Fixed category; `None` classifies from the preceding text.
    #[cfg_attr(feature = "serde", serde(default))]
    pub category: Option<PriceCategory>,
    pub tier: RuleTier,
    /// Require whitespace or a string edge on both sides of the match.
    #[cfg_attr(feature = "serde", serde(default))]
    pub standalone: bool,
}

impl PriceRule {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        confidence: f64,
        tier: RuleTier,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            confidence,
            category: None,
            tier,
            standalone: false,
        }
    }

    /// Fix the category instead of classifying from context.
    pub fn category(mut self, category: PriceCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Require whitespace or string edges around the match.
    pub fn standalone(mut self) -> Self {
        self.standalone = true;
        self
    }
}

/// An ordered, prioritized list of rules.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleSet {
    pub rules: Vec<PriceRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<PriceRule>) -> Self {
        Self { rules }
    }

    /// Only the currency-symbol, currency-code and bare-number rules.
    pub fn currency_only() -> Self {
        let mut rules = symbol_rules();
        rules.extend(code_rules());
        rules.extend(bare_rules());
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    /// Currency symbols, Greek and English keywords, currency codes, bare numbers.
    fn default() -> Self {
        let mut rules = symbol_rules();
        rules.extend(keyword_rules());
        rules.extend(code_rules());
        rules.extend(bare_rules());
        Self { rules }
    }
}

fn symbol_rules() -> Vec<PriceRule> {
    vec![
        PriceRule::new(
            "euro-prefix",
            format!(r"€\s?(?P<amount>{AMOUNT_TWO_DECIMALS})\b"),
            0.95,
            RuleTier::CurrencySymbol,
        ),
        PriceRule::new(
            "euro-suffix",
            format!(r"(?P<amount>{AMOUNT_TWO_DECIMALS})\b\s?€"),
            0.95,
            RuleTier::CurrencySymbol,
        ),
    ]
}

/// Keyword rule: keyword, optional rate (`24%`), optional `:`/`=`, optional
/// euro sign, amount.
fn keyword(name: &str, keywords: &str, confidence: f64, category: PriceCategory) -> PriceRule {
    PriceRule::new(
        name,
        format!(
            r"(?i)\b(?:{keywords})\s*(?:\d{{1,2}}(?:[.,]\d)?\s?%\s*)?[:=]?\s*(?:€\s?)?(?P<amount>{AMOUNT_ANY})\b"
        ),
        confidence,
        RuleTier::Keyword,
    )
    .category(category)
}

fn keyword_rules() -> Vec<PriceRule> {
    use PriceCategory::*;
    vec![
        keyword(
            "el-total",
            r"(?:γενικ[όο]\s+)?σ[ύυ]νολο|πληρωτ[έε]ο(?:\s+ποσ[όο])?",
            0.92,
            Total,
        ),
        keyword("el-unit-price", r"τιμ[ήη]\s+μον[άα]δας", 0.90, Product),
        keyword("el-price", r"τιμ[ήη]", 0.88, Product),
        keyword("el-vat", r"φ\.?\s?π\.?\s?α\.?", 0.88, Tax),
        keyword(
            "el-shipping",
            r"μεταφορικ[άα]|(?:[έε]ξοδα\s+)?αποστολ[ήη]ς?",
            0.86,
            Shipping,
        ),
        keyword("el-cost", r"κ[όο]στος", 0.85, Product),
        keyword("el-amount", r"ποσ[όο]|αξ[ίι]α", 0.84, Other),
        keyword("el-discount", r"[έε]κπτωση", 0.82, Other),
        keyword("en-total", r"(?:grand\s+|sub)?total", 0.88, Total),
        keyword("en-price", r"unit\s+price|price", 0.85, Product),
        keyword("en-vat", r"vat|tax", 0.84, Tax),
        keyword("en-shipping", r"shipping|delivery|freight", 0.82, Shipping),
        keyword("en-cost", r"cost", 0.80, Product),
        keyword("en-amount", r"amount|value", 0.80, Other),
        keyword("en-discount", r"discount", 0.78, Other),
    ]
}

fn code_rules() -> Vec<PriceRule> {
    vec![
        PriceRule::new(
            "euro-prefix-loose",
            format!(r"€\s?(?P<amount>{AMOUNT_ANY})\b"),
            0.80,
            RuleTier::CurrencyCode,
        ),
        PriceRule::new(
            "euro-suffix-loose",
            format!(r"(?P<amount>{AMOUNT_ANY})\b\s?€"),
            0.75,
            RuleTier::CurrencyCode,
        ),
        PriceRule::new(
            "eur-code-suffix",
            format!(r"(?i)(?P<amount>{AMOUNT_ANY})\b\s?(?:eur|ευρ[ώω])\b"),
            0.70,
            RuleTier::CurrencyCode,
        ),
        PriceRule::new(
            "eur-code-prefix",
            format!(r"(?i)\beur\s?(?P<amount>{AMOUNT_ANY})\b"),
            0.65,
            RuleTier::CurrencyCode,
        ),
        PriceRule::new(
            "dollar",
            format!(r"\$\s?(?P<amount>{AMOUNT_ANY})\b"),
            0.55,
            RuleTier::CurrencyCode,
        ),
    ]
}

fn bare_rules() -> Vec<PriceRule> {
    vec![
        PriceRule::new(
            "bare-grouped",
            format!(r"(?P<amount>{AMOUNT_GROUPED})\b"),
            0.55,
            RuleTier::Bare,
        )
        .standalone(),
        PriceRule::new(
            "bare-decimal",
            r"(?P<amount>\d+[.,]\d{2})\b",
            0.45,
            RuleTier::Bare,
        )
        .standalone(),
    ]
}

static TOTAL_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)σ[ύυ]νολο|πληρωτ[έε]ο|\btotal\b|\bsubtotal\b").expect("valid regex")
});
static TAX_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)φ\.?π\.?α|\bvat\b|\btax\b").expect("valid regex"));
static SHIPPING_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)μεταφορικ|αποστολ|\bshipping\b|\bdelivery\b|\bfreight\b")
        .expect("valid regex")
});

/// Number of characters before a match inspected by [`classify_context`].
pub const CONTEXT_CHARS: usize = 40;

/// Classify a price from the text that precedes it.
///
/// Looks at the last [`CONTEXT_CHARS`] characters and returns the category
/// of the keyword that ends closest to the amount, if any.
pub fn classify_context(preceding: &str) -> Option<PriceCategory> {
    let start = preceding
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let window = &preceding[start..];

    [
        (&*TOTAL_CONTEXT, PriceCategory::Total),
        (&*TAX_CONTEXT, PriceCategory::Tax),
        (&*SHIPPING_CONTEXT, PriceCategory::Shipping),
    ]
    .into_iter()
    .filter_map(|(re, category)| re.find_iter(window).last().map(|m| (m.end(), category)))
    .max_by_key(|(end, _)| *end)
    .map(|(_, category)| category)
}
