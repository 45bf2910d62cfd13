//! Monetary amount parsing, rounding and formatting, plus the validated
//! [`Percentage`] input type.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Smallest accepted percentage: a −100% change takes every price to zero.
pub const MIN_PERCENTAGE: f64 = -100.0;

/// Round to two decimal places (cents), half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse the numeric part of a matched amount.
///
/// Every character other than ASCII digits, `.` and `,` is dropped. The last
/// separator is the decimal separator when one or two digits follow it;
/// every other separator is a thousands separator.
///
/// ```
/// use quotekit_core::money::parse_amount;
///
/// assert_eq!(parse_amount("1.234,56"), Some(1234.56));
/// assert_eq!(parse_amount("1,234.56"), Some(1234.56));
/// assert_eq!(parse_amount("12.500"), Some(12500.0));
/// assert_eq!(parse_amount("€ 99,9"), Some(99.9));
/// ```
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let normalized = match cleaned.rfind(['.', ',']) {
        Some(idx) => {
            let fraction = &cleaned[idx + 1..];
            let integer: String = cleaned[..idx].chars().filter(|c| c.is_ascii_digit()).collect();
            if (1..=2).contains(&fraction.len()) {
                format!("{}.{fraction}", if integer.is_empty() { "0" } else { &integer })
            } else {
                format!("{integer}{fraction}")
            }
        }
        None => cleaned,
    };

    let value: f64 = normalized.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Format a value for display or overlay: symbol followed by two decimals.
pub fn format_price(symbol: &str, value: f64) -> String {
    format!("{symbol}{value:.2}")
}

/// A validated percentage change.
///
/// Only finite values of at least [`MIN_PERCENTAGE`] can be constructed, so
/// the adjuster never sees NaN or a change that would produce negative prices.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Percentage(f64);

impl Percentage {
    /// No change.
    pub const ZERO: Percentage = Percentage(0.0);

    /// Validate a numeric percentage.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite);
        }
        if value < MIN_PERCENTAGE {
            return Err(ValidationError::BelowMinimum {
                value,
                minimum: MIN_PERCENTAGE,
            });
        }
        Ok(Percentage(value))
    }

    /// The raw percentage, e.g. `20.0` for +20%.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// The multiplier applied to original values, e.g. `1.2` for +20%.
    pub fn factor(&self) -> f64 {
        1.0 + self.0 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl FromStr for Percentage {
    type Err = ValidationError;

    /// Parse user input such as `"20"`, `"+12,5"`, `"-7.5 %"`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim().trim_end_matches('%').trim();
        let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let value: f64 = trimmed
            .replace(',', ".")
            .parse()
            .map_err(|_| ValidationError::NotANumber(input.to_string()))?;
        Percentage::new(value)
    }
}

impl TryFrom<f64> for Percentage {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Percentage::new(value)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}%", self.0)
    }
}
