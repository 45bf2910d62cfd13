use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use quotekit::ExtractMode;

/// Detect prices in quotation documents, adjust them by percentage and
/// stamp the new values onto the PDF.
#[derive(Debug, Parser)]
#[command(name = "quotekit", about, version)]
pub struct Cli {
    /// Log debug output to stderr (QUOTEKIT_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the prices detected in a document
    Detect {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Detect prices, apply a percentage and print original and new values
    Adjust {
        #[command(flatten)]
        source: SourceArgs,

        /// Percentage change, e.g. '10', '-7.5' or '+12,5%'
        #[arg(long, short, allow_hyphen_values = true)]
        percentage: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print totals and per-category counts
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Percentage change to apply before summarizing
        #[arg(long, short, allow_hyphen_values = true)]
        percentage: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = TextFormat::Text)]
        format: TextFormat,
    },

    /// Dump the text the detector sees
    Text {
        /// Path to the document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Text extraction mode for PDFs
        #[arg(long, value_enum, default_value_t = ModeArg::Positioned)]
        mode: ModeArg,

        /// Output format
        #[arg(long, value_enum, default_value_t = TextFormat::Text)]
        format: TextFormat,
    },

    /// Write adjusted prices onto a copy of a PDF
    #[cfg(feature = "write")]
    Bake {
        #[command(flatten)]
        source: SourceArgs,

        /// Percentage change, e.g. '10', '-7.5' or '+12,5%'
        #[arg(long, short, allow_hyphen_values = true)]
        percentage: String,

        /// Path of the PDF to write
        #[arg(long, short, value_name = "FILE")]
        output: PathBuf,

        /// Currency symbol printed before new values
        #[arg(long, default_value = "€")]
        symbol: String,

        /// Font size of the new values in points
        #[arg(long, default_value_t = 10.0)]
        font_size: f64,
    },
}

/// Input and detector options shared by the price subcommands.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Path to the document (PDF, RTF, CSV, XLSX or plain text)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Page range (e.g. '1,3-5'). Default: all pages
    #[arg(long)]
    pub pages: Option<String>,

    /// Text extraction mode for PDFs
    #[arg(long, value_enum, default_value_t = ModeArg::Positioned)]
    pub mode: ModeArg,

    /// JSON file with a custom rule set
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Largest accepted price value (exclusive)
    #[arg(long)]
    pub max_value: Option<f64>,

    /// Refuse inputs larger than this many bytes
    #[arg(long)]
    pub max_input_bytes: Option<usize>,
}

/// Output format for price listings.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated text
    Text,
    /// JSON output
    Json,
    /// CSV output
    Csv,
}

/// Output format for text and summary output.
#[derive(Debug, Clone, ValueEnum)]
pub enum TextFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
}

/// PDF text extraction mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// One block of text per page, synthesized positions
    Bulk,
    /// One fragment per text run with its page coordinates
    Positioned,
}

impl From<ModeArg> for ExtractMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Bulk => ExtractMode::Bulk,
            ModeArg::Positioned => ExtractMode::Positioned,
        }
    }
}
