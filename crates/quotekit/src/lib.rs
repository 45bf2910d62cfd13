//! quotekit: find prices in quotation documents, adjust them by percentage
//! and write the new values back.
//!
//! This is the public API facade. It re-exports the data types and
//! algorithms of `quotekit-core` and the text source adapters of
//! `quotekit-parse`, and adds the [`ExtractionEngine`] that ties them
//! together.
//!
//! # Architecture
//!
//! - **quotekit-core**: detection rules, detector, adjuster, overlay plan
//! - **quotekit-parse**: PDF, RTF, CSV, XLSX and plain text adapters
//! - **quotekit** (this crate): documents, load generations, PDF bake-in
//!
//! ```ignore
//! use quotekit::{EngineOptions, ExtractMode, ExtractionEngine, Percentage};
//!
//! let engine = ExtractionEngine::init(EngineOptions::default());
//! let token = engine.begin_load();
//! let doc = engine.open(&bytes, Some("offer.pdf"))?;
//! let prices = engine.detect_document(&doc, &token, ExtractMode::Positioned)?.value;
//! let adjusted = quotekit::apply_percentage_to_all(&prices, "10".parse::<Percentage>()?);
//! ```

#[cfg(feature = "write")]
pub mod bake;
#[cfg(feature = "serde")]
pub mod config;
pub mod document;
pub mod engine;

pub use quotekit_core;
pub use quotekit_parse;

pub use quotekit_core::{
    AdjustError, DetectedPrice, DetectorOptions, ExtractResult, ExtractWarning,
    ExtractWarningCode, OverlayInstruction, OverlayOptions, Percentage, Point, PriceCategory,
    PriceDetector, PriceRule, PriceSet, PriceSummary, QuoteError, Rect, RuleSet, RuleTier,
    TextFragment, ValidationError, apply_percentage_to_all, format_price, plan_overlays, reset,
    summarize, update_single,
};
pub use quotekit_parse::ExtractMode;

#[cfg(feature = "write")]
pub use bake::bake_overlays;
#[cfg(feature = "serde")]
pub use config::{engine_options_from_json, rule_set_from_json};
pub use document::{Document, DocumentFormat};
pub use engine::{EngineOptions, ExtractionEngine, LoadToken};
