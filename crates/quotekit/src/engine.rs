//! The extraction engine: explicit setup, load generations and
//! document-wide detection.

use std::sync::atomic::{AtomicU64, Ordering};

use quotekit_core::{
    DetectedPrice, DetectorOptions, ExtractResult, ExtractWarning, ExtractWarningCode,
    PriceDetector, QuoteError, SkippedRule, sort_prices,
};
use quotekit_parse::ExtractMode;

use crate::document::Document;

/// Options for [`ExtractionEngine::init`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineOptions {
    /// Reject inputs larger than this many bytes. Default: no limit.
    pub max_input_bytes: Option<usize>,
    pub detector: DetectorOptions,
}

/// Identifies one document load. Stale once a newer load begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken {
    generation: u64,
}

impl LoadToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the compiled detector and the load generation counter.
///
/// ```ignore
/// let engine = ExtractionEngine::init(EngineOptions::default());
/// let token = engine.begin_load();
/// let doc = engine.open(&bytes, Some("offer.pdf"))?;
/// let prices = engine.detect_document(&doc, &token, ExtractMode::Positioned)?;
/// engine.dispose();
/// ```
#[derive(Debug)]
pub struct ExtractionEngine {
    options: EngineOptions,
    detector: PriceDetector,
    generation: AtomicU64,
}

impl ExtractionEngine {
    /// Compile the rule set and start at generation zero.
    pub fn init(options: EngineOptions) -> Self {
        let detector = PriceDetector::new(options.detector.clone());
        tracing::debug!(
            rules = options.detector.rules.len(),
            skipped = detector.skipped_rules().len(),
            "extraction engine initialized"
        );
        Self {
            options,
            detector,
            generation: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn detector(&self) -> &PriceDetector {
        &self.detector
    }

    pub fn skipped_rules(&self) -> &[SkippedRule] {
        self.detector.skipped_rules()
    }

    /// Start a new load, making every earlier token stale.
    pub fn begin_load(&self) -> LoadToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "document load started");
        LoadToken { generation }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, token: &LoadToken) -> bool {
        token.generation == self.current_generation()
    }

    fn check_current(&self, token: &LoadToken) -> Result<(), QuoteError> {
        let current = self.current_generation();
        if token.generation == current {
            Ok(())
        } else {
            tracing::debug!(generation = token.generation, current, "document load superseded");
            Err(QuoteError::Superseded {
                generation: token.generation,
                current,
            })
        }
    }

    /// Open document bytes, enforcing `max_input_bytes`.
    pub fn open(&self, bytes: &[u8], file_name: Option<&str>) -> Result<Document, QuoteError> {
        if let Some(max_bytes) = self.options.max_input_bytes {
            if bytes.len() > max_bytes {
                return Err(QuoteError::ResourceLimitExceeded {
                    limit_name: "max_input_bytes".to_string(),
                    limit_value: max_bytes,
                    actual_value: bytes.len(),
                });
            }
        }
        Document::open(bytes, file_name)
    }

    /// Detect prices in text that did not come from a document.
    pub fn detect_text(&self, text: &str) -> Vec<DetectedPrice> {
        self.detector.detect_text(text, 0)
    }

    /// Detect prices on every page of `doc`.
    ///
    /// # Errors
    ///
    /// [`QuoteError::Superseded`] when `token` went stale before detection
    /// finished. Page-level extraction problems are warnings, not errors.
    pub fn detect_document(
        &self,
        doc: &Document,
        token: &LoadToken,
        mode: ExtractMode,
    ) -> Result<ExtractResult<Vec<DetectedPrice>>, QuoteError> {
        let pages: Vec<usize> = (0..doc.page_count()).collect();
        self.detect_pages(doc, token, mode, &pages)
    }

    /// Detect prices on the given zero-based pages. Out-of-range indices
    /// are skipped.
    pub fn detect_pages(
        &self,
        doc: &Document,
        token: &LoadToken,
        mode: ExtractMode,
        pages: &[usize],
    ) -> Result<ExtractResult<Vec<DetectedPrice>>, QuoteError> {
        self.detect_pages_with_progress(doc, token, mode, pages, &|_| {})
    }

    /// Like [`detect_pages`](Self::detect_pages), calling `on_page` with each
    /// page index once that page is done. With the `parallel` feature the
    /// calls may come from worker threads in any order.
    pub fn detect_pages_with_progress(
        &self,
        doc: &Document,
        token: &LoadToken,
        mode: ExtractMode,
        pages: &[usize],
        on_page: &(dyn Fn(usize) + Sync),
    ) -> Result<ExtractResult<Vec<DetectedPrice>>, QuoteError> {
        self.check_current(token)?;
        let pages: Vec<usize> = pages
            .iter()
            .copied()
            .filter(|&p| p < doc.page_count())
            .collect();

        let per_page = self.run_pages(doc, token, mode, &pages, on_page)?;
        self.check_current(token)?;

        let mut prices = Vec::new();
        let mut warnings: Vec<ExtractWarning> = self
            .skipped_rules()
            .iter()
            .map(|rule| {
                ExtractWarning::with_code(
                    ExtractWarningCode::InvalidRule,
                    format!("rule {} skipped: {}", rule.name, rule.error),
                )
            })
            .collect();
        for page in per_page {
            prices.extend(page.value);
            warnings.extend(page.warnings);
        }
        sort_prices(&mut prices);
        Ok(ExtractResult::with_warnings(prices, warnings))
    }

    fn detect_page(
        &self,
        doc: &Document,
        token: &LoadToken,
        mode: ExtractMode,
        index: usize,
        on_page: &(dyn Fn(usize) + Sync),
    ) -> Result<ExtractResult<Vec<DetectedPrice>>, QuoteError> {
        self.check_current(token)?;
        let fragments = doc.page_fragments(index, mode);
        let prices = self.detector.detect_fragments(&fragments.value);
        on_page(index);
        Ok(ExtractResult::with_warnings(prices, fragments.warnings))
    }

    #[cfg(not(feature = "parallel"))]
    fn run_pages(
        &self,
        doc: &Document,
        token: &LoadToken,
        mode: ExtractMode,
        pages: &[usize],
        on_page: &(dyn Fn(usize) + Sync),
    ) -> Result<Vec<ExtractResult<Vec<DetectedPrice>>>, QuoteError> {
        pages
            .iter()
            .map(|&index| self.detect_page(doc, token, mode, index, on_page))
            .collect()
    }

    /// Pages run concurrently; results come back in page order.
    #[cfg(feature = "parallel")]
    fn run_pages(
        &self,
        doc: &Document,
        token: &LoadToken,
        mode: ExtractMode,
        pages: &[usize],
        on_page: &(dyn Fn(usize) + Sync),
    ) -> Result<Vec<ExtractResult<Vec<DetectedPrice>>>, QuoteError> {
        use rayon::prelude::*;

        pages
            .par_iter()
            .map(|&index| self.detect_page(doc, token, mode, index, on_page))
            .collect()
    }

    /// Release the engine. Outstanding tokens are meaningless afterwards.
    pub fn dispose(self) {
        tracing::debug!(generation = self.current_generation(), "extraction engine disposed");
    }
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::init(EngineOptions::default())
    }
}
