//! quotekit-core: backend-independent price detection and adjustment.
//!
//! This crate provides the data types (TextFragment, DetectedPrice,
//! Percentage, etc.) and algorithms (rule-based detection, deduplication,
//! percentage adjustment, overlay planning) used by quotekit. It performs no
//! I/O; document parsing lives in `quotekit-parse`.

pub mod adjust;
pub mod dedupe;
pub mod detect;
pub mod error;
pub mod fragment;
pub mod geometry;
pub mod money;
pub mod overlay;
pub mod price;
pub mod rules;
pub mod summary;

pub use adjust::{PriceSet, apply_percentage_to_all, reset, update_single};
pub use dedupe::{DedupeOptions, is_duplicate};
pub use detect::{DetectorOptions, PriceDetector, SkippedRule};
pub use error::{
    AdjustError, ExtractResult, ExtractWarning, ExtractWarningCode, QuoteError, ValidationError,
};
pub use fragment::{TextFragment, join_fragments};
pub use geometry::{Point, Rect};
pub use money::{Percentage, format_price, parse_amount, round2};
pub use overlay::{OverlayInstruction, OverlayOptions, plan_overlays};
pub use price::{DetectedPrice, PriceCategory, price_order, sort_prices};
pub use rules::{PriceRule, RuleSet, RuleTier, classify_context};
pub use summary::{PriceSummary, summarize};
