//! WebAssembly/JavaScript bindings for quotekit.
//!
//! Exposes the price editor flow to the browser: open a document, detect
//! its prices, adjust them and build the overlay plan. Complex values are
//! serialized to `JsValue` with serde_wasm_bindgen, using camelCase field
//! names.

use std::fmt::Display;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use quotekit::{
    AdjustError, Document, EngineOptions, ExtractMode, ExtractWarning, ExtractionEngine,
    LoadToken, OverlayInstruction, OverlayOptions, Percentage, PriceSet, QuoteError,
    ValidationError, plan_overlays,
};

fn js_error(e: impl Display) -> JsError {
    JsError::new(&e.to_string())
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Parse a JS extraction mode string; `positioned` when absent.
fn parse_mode(mode: Option<&str>) -> Result<ExtractMode, String> {
    match mode.map(str::to_ascii_lowercase).as_deref() {
        None | Some("positioned") => Ok(ExtractMode::Positioned),
        Some("bulk") => Ok(ExtractMode::Bulk),
        Some(other) => Err(format!(
            "unknown extraction mode '{other}' (expected 'bulk' or 'positioned')"
        )),
    }
}

/// The extraction engine (WASM binding).
///
/// Opening a document starts a new load; sessions from earlier loads can
/// still be edited but no longer detect.
///
/// # JavaScript Usage
///
/// ```js
/// const engine = new WasmEngine();
/// const session = engine.open(bytes, "offer.pdf");
/// session.detect("positioned");
/// session.applyPercentage("+10");
/// console.log(session.summary().totalAfter);
/// ```
#[wasm_bindgen]
pub struct WasmEngine {
    inner: Rc<ExtractionEngine>,
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    #[allow(clippy::new_without_default)]
    pub fn new() -> WasmEngine {
        WasmEngine {
            inner: Rc::new(ExtractionEngine::init(EngineOptions::default())),
        }
    }

    /// Open a document from raw bytes (Uint8Array in JavaScript).
    ///
    /// `fileName` helps to recognize CSV input.
    pub fn open(&self, data: &[u8], file_name: Option<String>) -> Result<WasmSession, JsError> {
        self.open_session(data, file_name.as_deref()).map_err(js_error)
    }

    /// Generation of the most recent load.
    #[wasm_bindgen(getter)]
    pub fn generation(&self) -> f64 {
        self.inner.current_generation() as f64
    }
}

impl WasmEngine {
    fn open_session(&self, data: &[u8], file_name: Option<&str>) -> Result<WasmSession, QuoteError> {
        let token = self.inner.begin_load();
        let document = self.inner.open(data, file_name)?;
        Ok(WasmSession {
            engine: Rc::clone(&self.inner),
            document,
            token,
            prices: PriceSet::default(),
            warnings: Vec::new(),
        })
    }
}

/// One loaded document and the current snapshot of its prices.
#[wasm_bindgen]
pub struct WasmSession {
    engine: Rc<ExtractionEngine>,
    document: Document,
    token: LoadToken,
    prices: PriceSet,
    warnings: Vec<ExtractWarning>,
}

#[wasm_bindgen]
impl WasmSession {
    #[wasm_bindgen(getter, js_name = "pageCount")]
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Detected input format: "pdf", "rtf", "csv", "xlsx" or "text".
    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        self.document.format().as_str().to_string()
    }

    /// Detect prices, replacing the current snapshot. Returns the count.
    ///
    /// `mode` is "positioned" (default) or "bulk".
    pub fn detect(&mut self, mode: Option<String>) -> Result<usize, JsError> {
        let mode = parse_mode(mode.as_deref()).map_err(js_error)?;
        self.run_detection(mode).map_err(js_error)
    }

    /// Current prices as an array of objects.
    #[wasm_bindgen(getter)]
    pub fn prices(&self) -> Result<JsValue, JsError> {
        to_js(self.prices.prices())
    }

    /// Warnings from the last detection.
    #[wasm_bindgen(getter)]
    pub fn warnings(&self) -> Result<JsValue, JsError> {
        to_js(&self.warnings)
    }

    /// Apply a percentage given as user input, e.g. "12,5" or "-7.5%".
    #[wasm_bindgen(js_name = "applyPercentage")]
    pub fn apply_percentage(&mut self, input: &str) -> Result<(), JsError> {
        self.apply_percentage_str(input).map_err(js_error)
    }

    /// Set one price by id.
    #[wasm_bindgen(js_name = "updateSingle")]
    pub fn update_single(&mut self, id: &str, value: f64) -> Result<(), JsError> {
        self.update_value(id, value).map_err(js_error)
    }

    /// Return every price to its original value.
    pub fn reset(&mut self) {
        self.prices = self.prices.reset();
    }

    pub fn summary(&self) -> Result<JsValue, JsError> {
        to_js(&self.prices.summary())
    }

    /// Overlay instructions for the modified prices.
    #[wasm_bindgen(js_name = "overlayPlan")]
    pub fn overlay_plan(&self, symbol: Option<String>) -> Result<JsValue, JsError> {
        to_js(&self.plan(symbol))
    }
}

impl WasmSession {
    fn run_detection(&mut self, mode: ExtractMode) -> Result<usize, QuoteError> {
        let result = self
            .engine
            .detect_document(&self.document, &self.token, mode)?;
        self.prices = PriceSet::new(result.value);
        self.warnings = result.warnings;
        Ok(self.prices.len())
    }

    fn apply_percentage_str(&mut self, input: &str) -> Result<(), ValidationError> {
        let percentage: Percentage = input.parse()?;
        self.prices = self.prices.apply_percentage(percentage);
        Ok(())
    }

    fn update_value(&mut self, id: &str, value: f64) -> Result<(), AdjustError> {
        self.prices = self.prices.update_single(id, value)?;
        Ok(())
    }

    fn plan(&self, symbol: Option<String>) -> Vec<OverlayInstruction> {
        let mut options = OverlayOptions::default();
        if let Some(symbol) = symbol {
            options.currency_symbol = symbol;
        }
        plan_overlays(self.prices.prices(), &options)
    }
}
