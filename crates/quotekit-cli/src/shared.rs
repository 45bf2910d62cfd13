use std::io::{self, IsTerminal, Write};
use std::path::Path;

use quotekit::{
    DetectedPrice, Document, EngineOptions, ExtractWarning, ExtractionEngine, Percentage,
    rule_set_from_json,
};

use crate::cli::SourceArgs;
use crate::page_range::parse_page_range;

/// Exit code for unreadable input and failed extraction.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for rejected user input.
pub const EXIT_INVALID_INPUT: i32 = 2;

/// A document loaded through the engine, with its raw bytes.
pub struct Loaded {
    pub engine: ExtractionEngine,
    pub document: Document,
    pub bytes: Vec<u8>,
}

/// Validate a percentage argument.
///
/// Prints the reason and returns `Err(2)` when the input is rejected.
pub fn parse_percentage(input: &str) -> Result<Percentage, i32> {
    input.parse::<Percentage>().map_err(|e| {
        eprintln!("Error: {e}");
        EXIT_INVALID_INPUT
    })
}

/// Build an engine from the detector options on the command line.
pub fn build_engine(args: &SourceArgs) -> Result<ExtractionEngine, i32> {
    let mut options = EngineOptions {
        max_input_bytes: args.max_input_bytes,
        ..EngineOptions::default()
    };

    if let Some(path) = &args.rules {
        let json = std::fs::read_to_string(path).map_err(|e| {
            eprintln!("Error: failed to read rules {}: {e}", path.display());
            EXIT_FAILURE
        })?;
        options.detector.rules = rule_set_from_json(&json).map_err(|e| {
            eprintln!("Error: invalid rules file {}: {e}", path.display());
            EXIT_INVALID_INPUT
        })?;
    }
    if let Some(max_value) = args.max_value {
        if !(max_value.is_finite() && max_value > 0.0) {
            eprintln!("Error: --max-value must be a positive number");
            return Err(EXIT_INVALID_INPUT);
        }
        options.detector.max_value = max_value;
    }

    let engine = ExtractionEngine::init(options);
    for rule in engine.skipped_rules() {
        eprintln!("Warning: rule {} skipped: {}", rule.name, rule.error);
    }
    Ok(engine)
}

/// Read a document file with user-friendly error messages.
pub fn open_document(engine: &ExtractionEngine, file: &Path) -> Result<(Document, Vec<u8>), i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(EXIT_FAILURE);
    }
    let bytes = std::fs::read(file).map_err(|e| {
        eprintln!("Error: failed to read {}: {e}", file.display());
        EXIT_FAILURE
    })?;
    let file_name = file.file_name().and_then(|n| n.to_str());
    let document = engine.open(&bytes, file_name).map_err(|e| {
        eprintln!("Error: failed to open document: {e}");
        EXIT_FAILURE
    })?;
    Ok((document, bytes))
}

/// Build the engine and open `args.file` with it.
pub fn load(args: &SourceArgs) -> Result<Loaded, i32> {
    let engine = build_engine(args)?;
    let (document, bytes) = open_document(&engine, &args.file)?;
    Ok(Loaded {
        engine,
        document,
        bytes,
    })
}

/// Run detection over the selected pages, printing warnings to stderr.
pub fn detect(args: &SourceArgs, loaded: &Loaded) -> Result<Vec<DetectedPrice>, i32> {
    let pages = resolve_pages(args.pages.as_deref(), loaded.document.page_count())?;
    let token = loaded.engine.begin_load();
    let result = loaded
        .engine
        .detect_pages(&loaded.document, &token, args.mode.into(), &pages)
        .map_err(|e| {
            eprintln!("Error: detection failed: {e}");
            EXIT_FAILURE
        })?;
    report_warnings(&result.warnings);
    Ok(result.value)
}

/// Resolve an optional page range string into 0-indexed page indices.
///
/// If `pages` is `None`, returns all pages (0..page_count).
pub fn resolve_pages(pages: Option<&str>, page_count: usize) -> Result<Vec<usize>, i32> {
    match pages {
        Some(range) => parse_page_range(range, page_count).map_err(|e| {
            eprintln!("Error: {e}");
            EXIT_INVALID_INPUT
        }),
        None => Ok((0..page_count).collect()),
    }
}

pub fn report_warnings(warnings: &[ExtractWarning]) {
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
}

/// Serialize to a JSON line, reporting serializer failures as exit code 1.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, i32> {
    serde_json::to_string(value).map_err(|e| {
        eprintln!("Error: failed to serialize output: {e}");
        EXIT_FAILURE
    })
}

/// Escape a string for CSV output.
///
/// If the text contains commas, double quotes, or newlines, wraps it in
/// double quotes and escapes any internal double quotes by doubling them.
pub fn csv_escape(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// A progress reporter that prints "Processing page N/M..." to stderr,
/// but only when stderr is connected to a TTY (terminal).
pub struct ProgressReporter {
    total: usize,
    is_tty: bool,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            is_tty: io::stderr().is_terminal(),
        }
    }

    /// Report progress for page `current` (1-indexed).
    pub fn report(&self, current: usize) {
        if self.is_tty {
            eprint!("\rProcessing page {}/{}...", current, self.total);
            let _ = io::stderr().flush();
        }
    }

    /// Clear the progress line (if TTY).
    pub fn finish(&self) {
        if self.is_tty {
            eprint!("\r{}\r", " ".repeat(40));
            let _ = io::stderr().flush();
        }
    }
}
